use axum::http::HeaderMap;
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use realty_insights::cache::{SessionCache, SessionRegistry};
use realty_insights::config::AppConfig;
use realty_insights::error::AppError;
use realty_insights::loader::{BackendKind, ConcurrentLoader, ExecutionBackend, ProcessPool};
use realty_insights::source;
use serde::Deserialize;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) const SESSION_HEADER: &str = "x-session-id";
pub(crate) const DEFAULT_SESSION: &str = "default";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Shared by every listing route: one loader, one cache per session.
#[derive(Clone)]
pub(crate) struct ListingState {
    pub(crate) loader: Arc<ConcurrentLoader>,
    pub(crate) sessions: Arc<SessionRegistry>,
}

impl ListingState {
    pub(crate) fn with_sessions(loader: ConcurrentLoader, sessions: SessionRegistry) -> Self {
        Self {
            loader: Arc::new(loader),
            sessions: Arc::new(sessions),
        }
    }

    /// Cache for the session named by the `x-session-id` header.
    pub(crate) fn session(&self, headers: &HeaderMap) -> Arc<SessionCache> {
        let id = headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_SESSION);
        self.sessions.session(id)
    }
}

/// Loader wired from configuration. The process backend re-runs this
/// executable's hidden `worker` command.
pub(crate) fn build_loader(config: &AppConfig) -> Result<ConcurrentLoader, AppError> {
    let source = source::from_config(&config.loader, &config.database)?;
    let backend = match config.loader.backend {
        BackendKind::Tasks => ExecutionBackend::Tasks,
        BackendKind::Processes => ExecutionBackend::Processes(ProcessPool::current_exe()?),
    };
    Ok(ConcurrentLoader::new(source, backend).with_policy(config.loader.failure_policy))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use realty_insights::listings::PropertyDomain;
    use realty_insights::source::InMemorySource;

    #[test]
    fn parse_date_rejects_other_formats() {
        assert_eq!(
            parse_date(" 2024-03-05 "),
            Ok(NaiveDate::from_ymd_opt(2024, 3, 5).expect("valid date"))
        );
        assert!(parse_date("05.03.2024").is_err());
    }

    #[test]
    fn sessions_are_keyed_by_header() {
        let state = ListingState::with_sessions(
            ConcurrentLoader::new(Arc::new(InMemorySource::new()), ExecutionBackend::Tasks),
            SessionRegistry::new(),
        );

        let mut alice = HeaderMap::new();
        alice.insert(SESSION_HEADER, HeaderValue::from_static("alice"));
        let anonymous = HeaderMap::new();

        let cache = state.session(&alice);
        assert!(Arc::ptr_eq(&cache, &state.session(&alice)));
        assert!(!Arc::ptr_eq(&cache, &state.session(&anonymous)));
        assert!(state.session(&anonymous).get(PropertyDomain::Lands).is_none());
        assert_eq!(state.sessions.len(), 2);
    }
}
