use crate::cache::{DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_IDLE};
use crate::loader::{BackendKind, FailurePolicy};
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub database: DatabaseConfig,
    pub loader: LoaderConfig,
    pub sessions: SessionConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            database: DatabaseConfig::from_env()?,
            loader: LoaderConfig::from_env()?,
            sessions: SessionConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// PostgreSQL connection parameters.
///
/// Credentials stay optional here so offline runs against a CSV export do not
/// need them; [`DatabaseConfig::require`] enforces them when Postgres is used.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: u16,
    pub name: Option<String>,
    pub max_connections: u32,
}

impl DatabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let port = env::var("POSTGRESQL_PORT")
            .unwrap_or_else(|_| "5432".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidDatabasePort)?;
        let max_connections = env::var("POSTGRESQL_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "4".to_string())
            .parse::<u32>()
            .ok()
            .filter(|value| *value > 0)
            .ok_or(ConfigError::InvalidMaxConnections)?;

        Ok(Self {
            user: non_empty_var("POSTGRESQL_USER"),
            password: non_empty_var("POSTGRESQL_PASSWORD"),
            host: non_empty_var("POSTGRESQL_HOST"),
            port,
            name: non_empty_var("POSTGRESQL_DBNAME"),
            max_connections,
        })
    }

    pub fn require(&self) -> Result<DatabaseCredentials<'_>, ConfigError> {
        Ok(DatabaseCredentials {
            user: self
                .user
                .as_deref()
                .ok_or(ConfigError::MissingVariable("POSTGRESQL_USER"))?,
            password: self
                .password
                .as_deref()
                .ok_or(ConfigError::MissingVariable("POSTGRESQL_PASSWORD"))?,
            host: self
                .host
                .as_deref()
                .ok_or(ConfigError::MissingVariable("POSTGRESQL_HOST"))?,
            port: self.port,
            database: self
                .name
                .as_deref()
                .ok_or(ConfigError::MissingVariable("POSTGRESQL_DBNAME"))?,
        })
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// Fully resolved credentials borrowed from [`DatabaseConfig`].
#[derive(Clone, Copy)]
pub struct DatabaseCredentials<'a> {
    pub user: &'a str,
    pub password: &'a str,
    pub host: &'a str,
    pub port: u16,
    pub database: &'a str,
}

/// Where listings come from and how the three domains are loaded.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub source_dir: Option<PathBuf>,
    pub backend: BackendKind,
    pub failure_policy: FailurePolicy,
}

impl LoaderConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let backend = match non_empty_var("LOADER_BACKEND") {
            Some(raw) => raw
                .parse::<BackendKind>()
                .map_err(|_| ConfigError::InvalidBackend(raw))?,
            None => BackendKind::Tasks,
        };
        let failure_policy = match non_empty_var("LOADER_FAILURE_POLICY") {
            Some(raw) => raw
                .parse::<FailurePolicy>()
                .map_err(|_| ConfigError::InvalidFailurePolicy(raw))?,
            None => FailurePolicy::AllOrNothing,
        };

        Ok(Self {
            source_dir: non_empty_var("LISTINGS_SOURCE_DIR").map(PathBuf::from),
            backend,
            failure_policy,
        })
    }
}

/// Bounds on the per-session caches held by the HTTP service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub idle_timeout: Duration,
    pub max_sessions: usize,
}

impl SessionConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let idle_timeout = match non_empty_var("SESSION_IDLE_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or(ConfigError::InvalidSessionSetting("SESSION_IDLE_TIMEOUT_SECS"))?,
            None => DEFAULT_SESSION_IDLE,
        };
        let max_sessions = match non_empty_var("SESSION_MAX_COUNT") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|count| *count > 0)
                .ok_or(ConfigError::InvalidSessionSetting("SESSION_MAX_COUNT"))?,
            None => DEFAULT_MAX_SESSIONS,
        };

        Ok(Self {
            idle_timeout,
            max_sessions,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidDatabasePort,
    InvalidMaxConnections,
    InvalidBackend(String),
    InvalidFailurePolicy(String),
    MissingVariable(&'static str),
    InvalidSessionSetting(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidDatabasePort => write!(f, "POSTGRESQL_PORT must be a valid u16"),
            ConfigError::InvalidMaxConnections => {
                write!(f, "POSTGRESQL_MAX_CONNECTIONS must be a positive integer")
            }
            ConfigError::InvalidBackend(value) => write!(
                f,
                "LOADER_BACKEND must be 'tasks' or 'processes', got '{}'",
                value
            ),
            ConfigError::InvalidFailurePolicy(value) => write!(
                f,
                "LOADER_FAILURE_POLICY must be 'all-or-nothing' or 'best-effort', got '{}'",
                value
            ),
            ConfigError::MissingVariable(key) => write!(f, "{} must be set", key),
            ConfigError::InvalidSessionSetting(key) => {
                write!(f, "{} must be a positive integer", key)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "POSTGRESQL_USER",
            "POSTGRESQL_PASSWORD",
            "POSTGRESQL_HOST",
            "POSTGRESQL_PORT",
            "POSTGRESQL_DBNAME",
            "POSTGRESQL_MAX_CONNECTIONS",
            "LISTINGS_SOURCE_DIR",
            "LOADER_BACKEND",
            "LOADER_FAILURE_POLICY",
            "SESSION_IDLE_TIMEOUT_SECS",
            "SESSION_MAX_COUNT",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.loader.backend, BackendKind::Tasks);
        assert_eq!(config.loader.failure_policy, FailurePolicy::AllOrNothing);
        assert!(config.loader.source_dir.is_none());
        assert_eq!(config.sessions.idle_timeout, DEFAULT_SESSION_IDLE);
        assert_eq!(config.sessions.max_sessions, DEFAULT_MAX_SESSIONS);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn database_credentials_report_first_missing_variable() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("POSTGRESQL_USER", "scraper");
        env::set_var("POSTGRESQL_PASSWORD", "secret");
        let config = AppConfig::load().expect("config loads");

        match config.database.require() {
            Err(ConfigError::MissingVariable(key)) => assert_eq!(key, "POSTGRESQL_HOST"),
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("host and database name are missing"),
        }
        assert!(!format!("{:?}", config.database).contains("secret"));
    }

    #[test]
    fn loader_settings_parse_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("LOADER_BACKEND", "processes");
        env::set_var("LOADER_FAILURE_POLICY", "best-effort");
        env::set_var("LISTINGS_SOURCE_DIR", "/srv/exports");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.loader.backend, BackendKind::Processes);
        assert_eq!(config.loader.failure_policy, FailurePolicy::BestEffort);
        assert_eq!(config.loader.source_dir, Some(PathBuf::from("/srv/exports")));
    }

    #[test]
    fn rejects_unknown_backend() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("LOADER_BACKEND", "fibers");
        let error = AppConfig::load().expect_err("backend is invalid");
        assert!(matches!(error, ConfigError::InvalidBackend(value) if value == "fibers"));
    }

    #[test]
    fn session_limits_parse_and_reject_zero() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SESSION_IDLE_TIMEOUT_SECS", "600");
        env::set_var("SESSION_MAX_COUNT", "8");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.sessions.idle_timeout, Duration::from_secs(600));
        assert_eq!(config.sessions.max_sessions, 8);

        env::set_var("SESSION_MAX_COUNT", "0");
        let error = AppConfig::load().expect_err("zero sessions is invalid");
        assert!(matches!(error, ConfigError::InvalidSessionSetting("SESSION_MAX_COUNT")));
    }
}
