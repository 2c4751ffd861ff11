//! Readers returning one raw row set per listing domain.
//!
//! Every reader answers the same fixed per-domain query and reports any
//! connectivity, authentication or query failure as [`SourceUnavailable`].
//! Nothing is retried at this layer.

mod csv_dir;
mod memory;
mod postgres;

pub use csv_dir::CsvDirectorySource;
pub use memory::InMemorySource;
pub use postgres::PostgresSource;

use crate::config::{ConfigError, DatabaseConfig, LoaderConfig};
use crate::listings::PropertyDomain;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A single untyped cell as delivered by the backing store.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl RawValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Timestamp(_) => "timestamp",
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<DateTime<Utc>> for RawValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Rows returned by one domain query, stored column-aligned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRowSet {
    columns: Vec<String>,
    rows: Vec<Vec<RawValue>>,
}

impl RawRowSet {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn rows(&self) -> &[Vec<RawValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row already aligned with `columns`. Short rows are padded
    /// with nulls and surplus cells are dropped.
    pub fn push_values(&mut self, mut values: Vec<RawValue>) {
        values.resize(self.columns.len(), RawValue::Null);
        self.rows.push(values);
    }

    /// Append a row given as column/value pairs. Columns not seen before are
    /// added to the set and back-filled with nulls.
    pub fn push_row<I, K, V>(&mut self, cells: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<RawValue>,
    {
        let mut row = vec![RawValue::Null; self.columns.len()];
        for (name, value) in cells {
            let name = name.as_ref();
            let index = match self.column_index(name) {
                Some(index) => index,
                None => {
                    self.columns.push(name.to_string());
                    for existing in &mut self.rows {
                        existing.push(RawValue::Null);
                    }
                    row.push(RawValue::Null);
                    self.columns.len() - 1
                }
            };
            row[index] = value.into();
        }
        self.rows.push(row);
    }

    pub fn with_row<I, K, V>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<RawValue>,
    {
        self.push_row(cells);
        self
    }
}

/// Fatal reader failure; the whole load is raised to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("source unavailable for {domain}: {reason}")]
pub struct SourceUnavailable {
    pub domain: PropertyDomain,
    pub reason: String,
}

impl SourceUnavailable {
    pub fn new(domain: PropertyDomain, reason: impl Into<String>) -> Self {
        Self {
            domain,
            reason: reason.into(),
        }
    }
}

/// Backing store able to answer the fixed read query of each domain.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    async fn read(&self, domain: PropertyDomain) -> Result<RawRowSet, SourceUnavailable>;
}

/// A CSV directory when one is configured, otherwise Postgres.
pub fn from_config(
    loader: &LoaderConfig,
    database: &DatabaseConfig,
) -> Result<Arc<dyn ListingSource>, ConfigError> {
    match &loader.source_dir {
        Some(dir) => Ok(Arc::new(CsvDirectorySource::new(dir))),
        None => Ok(Arc::new(PostgresSource::connect_lazy(database)?)),
    }
}
