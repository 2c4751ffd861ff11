use super::worker::WorkerReply;
use super::{run_pipeline, DomainOutcome, PipelineError};
use crate::listings::{DomainTable, PropertyDomain};
use crate::source::ListingSource;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tokio::process::Command;
use tokio::task::JoinSet;
use tracing::{debug, warn};

const STDERR_TAIL: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Tasks,
    Processes,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tasks => "tasks",
            Self::Processes => "processes",
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tasks" | "threads" => Ok(Self::Tasks),
            "processes" => Ok(Self::Processes),
            other => Err(other.to_string()),
        }
    }
}

/// Where the per-domain pipelines execute.
///
/// Both variants honour the same contract: every requested domain runs to
/// completion and exactly one outcome per domain is returned, in request order.
#[derive(Debug, Clone, Default)]
pub enum ExecutionBackend {
    /// Tokio tasks in this process.
    #[default]
    Tasks,
    /// One child process per domain.
    Processes(ProcessPool),
}

impl ExecutionBackend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Tasks => BackendKind::Tasks,
            Self::Processes(_) => BackendKind::Processes,
        }
    }

    pub async fn run_all(
        &self,
        source: Arc<dyn ListingSource>,
        domains: &[PropertyDomain],
    ) -> Vec<DomainOutcome> {
        let started = Instant::now();
        let mut pipelines = JoinSet::new();

        for &domain in domains {
            match self {
                Self::Tasks => {
                    let source = Arc::clone(&source);
                    pipelines.spawn(async move {
                        let outcome = run_pipeline(source.as_ref(), domain).await;
                        (domain, outcome)
                    });
                }
                Self::Processes(pool) => {
                    let pool = pool.clone();
                    pipelines.spawn(async move { (domain, pool.run(domain).await) });
                }
            }
        }

        let mut finished = HashMap::with_capacity(domains.len());
        while let Some(joined) = pipelines.join_next().await {
            match joined {
                Ok((domain, outcome)) => {
                    finished.insert(domain, outcome);
                }
                Err(join_err) => warn!(error = %join_err, "domain pipeline task panicked"),
            }
        }

        debug!(
            backend = self.kind().as_str(),
            domains = domains.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "joined domain pipelines"
        );

        domains
            .iter()
            .map(|&domain| {
                let outcome = finished.remove(&domain).unwrap_or_else(|| {
                    Err(PipelineError::worker_failed(domain, "pipeline task panicked"))
                });
                (domain, outcome)
            })
            .collect()
    }
}

/// Launches `program args... --domain <domain>` and reads a [`WorkerReply`]
/// from the child's stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessPool {
    program: PathBuf,
    args: Vec<String>,
    envs: Vec<(String, OsString)>,
}

impl ProcessPool {
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            envs: Vec::new(),
        }
    }

    /// Sets an environment variable on every child, on top of the inherited
    /// environment.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Re-invoke the running executable's hidden `worker` command.
    pub fn current_exe() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?, ["worker"]))
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    pub async fn run(&self, domain: PropertyDomain) -> Result<DomainTable, PipelineError> {
        let started = Instant::now();
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("--domain")
            .arg(domain.as_str())
            .envs(self.envs.iter().map(|(key, value)| (key, value)))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| {
                PipelineError::worker_failed(
                    domain,
                    format!("failed to spawn {}: {err}", self.program.display()),
                )
            })?;

        debug!(
            %domain,
            status = %output.status,
            stdout_bytes = output.stdout.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "worker process exited"
        );

        match serde_json::from_slice::<WorkerReply>(&output.stdout) {
            Ok(reply) => reply.into_result(domain),
            Err(err) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(PipelineError::worker_failed(
                    domain,
                    format!(
                        "worker exited with {} and an unreadable reply ({err}){}",
                        output.status,
                        stderr_tail(&stderr)
                    ),
                ))
            }
        }
    }
}

fn stderr_tail(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let start = trimmed
        .char_indices()
        .rev()
        .nth(STDERR_TAIL - 1)
        .map_or(0, |(index, _)| index);
    format!(": {}", &trimmed[start..])
}
