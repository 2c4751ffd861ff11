//! Fan-out/fan-in acquisition of the three listing domains.
//!
//! A load launches one Reader→Preprocessor pipeline per domain on the chosen
//! [`ExecutionBackend`], waits for all of them, and only then touches the
//! [`SessionCache`]. Under the default [`FailurePolicy::AllOrNothing`] a single
//! failed pipeline fails the whole load and nothing is committed; sibling
//! pipelines are left to finish and their tables are discarded.

mod backend;
pub mod worker;

pub use backend::{BackendKind, ExecutionBackend, ProcessPool};

use crate::cache::{CompleteLoad, SessionCache};
use crate::listings::{DomainTable, PropertyDomain};
use crate::preprocess::{preprocess, SchemaMismatch};
use crate::source::{ListingSource, SourceUnavailable};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Failure of one domain's Reader→Preprocessor pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineError {
    #[error(transparent)]
    SourceUnavailable(#[from] SourceUnavailable),
    #[error(transparent)]
    SchemaMismatch(#[from] SchemaMismatch),
    #[error("worker for {domain} failed: {reason}")]
    WorkerFailed {
        domain: PropertyDomain,
        reason: String,
    },
}

impl PipelineError {
    pub fn worker_failed(domain: PropertyDomain, reason: impl Into<String>) -> Self {
        Self::WorkerFailed {
            domain,
            reason: reason.into(),
        }
    }

    pub fn domain(&self) -> PropertyDomain {
        match self {
            Self::SourceUnavailable(err) => err.domain,
            Self::SchemaMismatch(err) => err.domain,
            Self::WorkerFailed { domain, .. } => *domain,
        }
    }
}

/// A load that did not produce a committable result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError {
    pub failures: Vec<PipelineError>,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listing load failed")?;
        for (index, failure) in self.failures.iter().enumerate() {
            let separator = if index == 0 { ": " } else { "; " };
            write!(f, "{separator}{failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.failures
            .first()
            .map(|failure| failure as &(dyn std::error::Error + 'static))
    }
}

/// What to do with the tables of successful domains when another one fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Discard the whole run; the cache is left untouched.
    #[default]
    AllOrNothing,
    /// Commit the domains that loaded and report the ones that did not.
    BestEffort,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all-or-nothing" | "all_or_nothing" | "strict" => Ok(Self::AllOrNothing),
            "best-effort" | "best_effort" => Ok(Self::BestEffort),
            other => Err(other.to_string()),
        }
    }
}

/// Per-domain result of a load, as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainStatus {
    pub domain: PropertyDomain,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PipelineError>,
}

impl DomainStatus {
    pub fn is_loaded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub policy: FailurePolicy,
    pub domains: Vec<DomainStatus>,
    pub elapsed_ms: u64,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.domains.iter().all(DomainStatus::is_loaded)
    }

    pub fn failure_for(&self, domain: PropertyDomain) -> Option<&PipelineError> {
        self.domains
            .iter()
            .find(|status| status.domain == domain)
            .and_then(|status| status.error.as_ref())
    }
}

pub type DomainOutcome = (PropertyDomain, Result<DomainTable, PipelineError>);

/// Runs the three domain pipelines and commits their tables to a cache.
#[derive(Clone)]
pub struct ConcurrentLoader {
    source: Arc<dyn ListingSource>,
    backend: ExecutionBackend,
    policy: FailurePolicy,
}

impl ConcurrentLoader {
    pub fn new(source: Arc<dyn ListingSource>, backend: ExecutionBackend) -> Self {
        Self {
            source,
            backend,
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn backend(&self) -> &ExecutionBackend {
        &self.backend
    }

    /// Run every domain pipeline and join them, without touching any cache.
    ///
    /// Outcomes come back in [`PropertyDomain::ordered`] order.
    pub async fn fetch_all(&self) -> Vec<DomainOutcome> {
        self.backend
            .run_all(Arc::clone(&self.source), &PropertyDomain::ordered())
            .await
    }

    /// Load all domains and commit them to `cache` according to the policy.
    pub async fn load_into(&self, cache: &SessionCache) -> Result<LoadReport, LoadError> {
        let started = Instant::now();
        let _loading = cache.begin_load();
        info!(
            backend = self.backend.kind().as_str(),
            source = self.source.name(),
            policy = ?self.policy,
            "loading listing domains"
        );

        let outcomes = self.fetch_all().await;
        let domains = outcomes
            .iter()
            .map(|(domain, outcome)| DomainStatus {
                domain: *domain,
                rows: outcome.as_ref().ok().map(DomainTable::len),
                error: outcome.as_ref().err().cloned(),
            })
            .collect::<Vec<_>>();
        let report = LoadReport {
            policy: self.policy,
            domains,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        let mut tables = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for (domain, outcome) in outcomes {
            match outcome {
                Ok(table) => tables.push(table),
                Err(error) => {
                    warn!(%domain, %error, "domain pipeline failed");
                    failures.push(error);
                }
            }
        }

        match self.policy {
            FailurePolicy::AllOrNothing => {
                if !failures.is_empty() {
                    cache.mark_failed();
                    return Err(LoadError { failures });
                }
                match CompleteLoad::from_tables(tables) {
                    Ok(complete) => cache.put_all(complete),
                    Err(missing) => {
                        cache.mark_failed();
                        return Err(LoadError {
                            failures: missing
                                .into_iter()
                                .map(|domain| {
                                    PipelineError::worker_failed(domain, "no table produced")
                                })
                                .collect(),
                        });
                    }
                }
            }
            FailurePolicy::BestEffort => {
                debug!(
                    loaded = tables.len(),
                    failed = failures.len(),
                    "committing best-effort load"
                );
                cache.merge(tables);
            }
        }

        info!(
            elapsed_ms = report.elapsed_ms,
            complete = report.is_complete(),
            "listing load finished"
        );
        Ok(report)
    }
}

impl fmt::Debug for ConcurrentLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentLoader")
            .field("source", &self.source.name())
            .field("backend", &self.backend)
            .field("policy", &self.policy)
            .finish()
    }
}

/// Reader→Preprocessor for one domain. Preprocessing runs on the blocking pool.
pub async fn run_pipeline(
    source: &dyn ListingSource,
    domain: PropertyDomain,
) -> Result<DomainTable, PipelineError> {
    let started = Instant::now();
    let rows = source.read(domain).await?;
    let raw_rows = rows.len();

    let table = tokio::task::spawn_blocking(move || preprocess(domain, &rows))
        .await
        .map_err(|err| {
            PipelineError::worker_failed(domain, format!("preprocessing panicked: {err}"))
        })??;

    debug!(
        %domain,
        raw_rows,
        rows = table.len(),
        elapsed_ms = started.elapsed().as_millis(),
        "domain pipeline finished"
    );
    Ok(table)
}
