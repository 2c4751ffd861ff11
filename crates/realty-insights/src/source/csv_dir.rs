use super::{ListingSource, RawRowSet, RawValue, SourceUnavailable};
use crate::listings::PropertyDomain;
use async_trait::async_trait;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads exported tables from `<dir>/<table_name>.csv`.
///
/// Blank cells become nulls; every other cell is kept as text and typed by
/// the preprocessors.
#[derive(Debug, Clone)]
pub struct CsvDirectorySource {
    dir: PathBuf,
}

impl CsvDirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, domain: PropertyDomain) -> PathBuf {
        self.dir.join(format!("{}.csv", domain.table_name()))
    }
}

#[async_trait]
impl ListingSource for CsvDirectorySource {
    fn name(&self) -> &str {
        "csv"
    }

    async fn read(&self, domain: PropertyDomain) -> Result<RawRowSet, SourceUnavailable> {
        let path = self.path_for(domain);
        debug!(%domain, path = %path.display(), "reading listing export");

        let result = tokio::task::spawn_blocking(move || {
            let file = std::fs::File::open(&path)
                .map_err(|err| format!("failed to open {}: {err}", path.display()))?;
            read_rows(file).map_err(|err| format!("invalid CSV in {}: {err}", path.display()))
        })
        .await
        .map_err(|err| SourceUnavailable::new(domain, format!("csv reader task failed: {err}")))?;

        result.map_err(|reason| SourceUnavailable::new(domain, reason))
    }
}

pub(crate) fn read_rows<R: Read>(reader: R) -> Result<RawRowSet, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = RawRowSet::new(csv_reader.headers()?.iter());
    for record in csv_reader.records() {
        let record = record?;
        rows.push_values(
            record
                .iter()
                .map(|cell| {
                    if cell.is_empty() {
                        RawValue::Null
                    } else {
                        RawValue::Text(cell.to_string())
                    }
                })
                .collect(),
        );
    }

    Ok(rows)
}
