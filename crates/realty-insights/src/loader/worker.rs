//! Stdout protocol between the process backend and its `worker` children.
//!
//! A child runs one domain pipeline and prints exactly one JSON
//! [`WorkerReply`] on stdout. Logs must go to stderr or nowhere.

use super::{run_pipeline, PipelineError};
use crate::listings::{DomainTable, PropertyDomain};
use crate::source::ListingSource;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkerReply {
    Loaded { table: DomainTable },
    Failed { error: PipelineError },
}

impl WorkerReply {
    pub fn from_result(result: Result<DomainTable, PipelineError>) -> Self {
        match result {
            Ok(table) => Self::Loaded { table },
            Err(error) => Self::Failed { error },
        }
    }

    /// Unwrap the reply for `expected`, rejecting tables of another domain.
    pub fn into_result(self, expected: PropertyDomain) -> Result<DomainTable, PipelineError> {
        match self {
            Self::Loaded { table } if table.domain() == expected => Ok(table),
            Self::Loaded { table } => Err(PipelineError::worker_failed(
                expected,
                format!("worker answered with a {} table", table.domain()),
            )),
            Self::Failed { error } => Err(error),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }
}

/// Run the pipeline for `domain` and write the reply to `out`.
///
/// Returns the reply so the caller can pick an exit status.
pub async fn run_worker<W: Write>(
    source: &dyn ListingSource,
    domain: PropertyDomain,
    mut out: W,
) -> io::Result<WorkerReply> {
    let reply = WorkerReply::from_result(run_pipeline(source, domain).await);
    serde_json::to_writer(&mut out, &reply)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{InMemorySource, RawRowSet, RawValue, SourceUnavailable};

    #[tokio::test]
    async fn worker_reply_round_trips_through_stdout_bytes() {
        let source = InMemorySource::new().with_domain(
            PropertyDomain::Apartments,
            RawRowSet::new([
                "url",
                "price",
                "utc_created_at",
                "province",
                "location",
                "latitude",
                "longitude",
                "apartment_area",
            ]),
        );

        let mut stdout = Vec::new();
        let reply = run_worker(&source, PropertyDomain::Apartments, &mut stdout)
            .await
            .expect("write reply");
        assert!(reply.is_loaded());

        let decoded: WorkerReply = serde_json::from_slice(&stdout).expect("decode reply");
        let table = decoded
            .into_result(PropertyDomain::Apartments)
            .expect("apartments table");
        assert_eq!(table, DomainTable::Apartments(Vec::new()));
    }

    #[tokio::test]
    async fn source_failure_is_reported_not_raised() {
        let source = InMemorySource::new();
        let mut stdout = Vec::new();
        let reply = run_worker(&source, PropertyDomain::Lands, &mut stdout)
            .await
            .expect("write reply");
        assert!(!reply.is_loaded());

        let decoded: WorkerReply = serde_json::from_slice(&stdout).expect("decode reply");
        let error = decoded
            .into_result(PropertyDomain::Lands)
            .expect_err("lands are missing");
        assert!(matches!(
            error,
            PipelineError::SourceUnavailable(SourceUnavailable {
                domain: PropertyDomain::Lands,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn decoded_reply_keeps_exact_price_per_m2() {
        let mut rows = RawRowSet::new([
            "url",
            "price",
            "utc_created_at",
            "province",
            "location",
            "latitude",
            "longitude",
            "land_area",
        ]);
        let areas = [33.3, 47.7, 61.9, 1500.5, 777.7];
        for (index, price) in (50_000..60_000).step_by(7).enumerate() {
            rows.push_row([
                ("url", RawValue::from(format!("https://lands/{index}"))),
                ("price", RawValue::Int(price)),
                ("utc_created_at", RawValue::from("2024-03-05T10:30:00Z")),
                ("province", RawValue::from("opolskie")),
                ("location", RawValue::from("country")),
                ("latitude", RawValue::Float(50.67)),
                ("longitude", RawValue::Float(17.92)),
                ("land_area", RawValue::Float(areas[index % areas.len()])),
            ]);
        }
        let source = InMemorySource::new().with_domain(PropertyDomain::Lands, rows);

        let mut stdout = Vec::new();
        run_worker(&source, PropertyDomain::Lands, &mut stdout)
            .await
            .expect("write reply");

        let decoded: WorkerReply = serde_json::from_slice(&stdout).expect("decode reply");
        let table = decoded
            .into_result(PropertyDomain::Lands)
            .expect("lands table");
        let lands = table.lands().expect("lands rows");
        assert_eq!(lands.len(), 1_429);
        for land in lands {
            assert_eq!(land.price_per_m2, Some(land.common.price / land.land_area));
        }
    }

    #[test]
    fn table_for_another_domain_is_rejected() {
        let reply = WorkerReply::Loaded {
            table: DomainTable::empty(PropertyDomain::Houses),
        };
        let error = reply
            .into_result(PropertyDomain::Lands)
            .expect_err("domain mismatch");
        assert_eq!(error.domain(), PropertyDomain::Lands);
    }
}
