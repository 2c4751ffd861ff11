use super::{ListingSource, RawRowSet, RawValue, SourceUnavailable};
use crate::config::{ConfigError, DatabaseConfig};
use crate::listings::PropertyDomain;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Executor, Row, Statement, TypeInfo};
use std::time::Duration;
use tracing::{debug, warn};

/// Scraper database holding the `otodom_*` tables.
#[derive(Debug, Clone)]
pub struct PostgresSource {
    pool: PgPool,
}

impl PostgresSource {
    /// Build a lazily connecting pool; connection errors surface on the first read.
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self, ConfigError> {
        let credentials = config.require()?;
        let options = PgConnectOptions::new()
            .host(credentials.host)
            .port(credentials.port)
            .username(credentials.user)
            .password(credentials.password)
            .database(credentials.database);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_lazy_with(options);

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ListingSource for PostgresSource {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn read(&self, domain: PropertyDomain) -> Result<RawRowSet, SourceUnavailable> {
        let sql = domain.query();
        let unavailable = |err: sqlx::Error| SourceUnavailable::new(domain, err.to_string());

        // Preparing first keeps the column list available for empty tables.
        let statement = (&self.pool).prepare(sql).await.map_err(unavailable)?;
        let mut rows = RawRowSet::new(
            statement
                .columns()
                .iter()
                .map(|column| column.name().to_string()),
        );

        let records = statement
            .query()
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;

        for record in &records {
            rows.push_values(decode_row(record));
        }

        debug!(%domain, rows = rows.len(), "fetched listing rows");
        Ok(rows)
    }
}

fn decode_row(row: &PgRow) -> Vec<RawValue> {
    row.columns()
        .iter()
        .map(|column| decode_cell(row, column.ordinal(), column.type_info().name()))
        .collect()
}

fn decode_cell(row: &PgRow, index: usize, type_name: &str) -> RawValue {
    let decoded: Result<Option<RawValue>, sqlx::Error> = match type_name {
        "BOOL" => row
            .try_get::<Option<bool>, _>(index)
            .map(|value| value.map(RawValue::Bool)),
        "INT2" => row
            .try_get::<Option<i16>, _>(index)
            .map(|value| value.map(|n| RawValue::Int(n.into()))),
        "INT4" => row
            .try_get::<Option<i32>, _>(index)
            .map(|value| value.map(|n| RawValue::Int(n.into()))),
        "INT8" => row
            .try_get::<Option<i64>, _>(index)
            .map(|value| value.map(RawValue::Int)),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(index)
            .map(|value| value.map(|n| RawValue::Float(n.into()))),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(index)
            .map(|value| value.map(RawValue::Float)),
        "NUMERIC" => row
            .try_get::<Option<Decimal>, _>(index)
            .map(|value| value.and_then(|n| n.to_f64()).map(RawValue::Float)),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(index)
            .map(|value| value.map(RawValue::Timestamp)),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(index)
            .map(|value| value.map(|ts| RawValue::Timestamp(ts.and_utc()))),
        "DATE" => row.try_get::<Option<NaiveDate>, _>(index).map(|value| {
            value
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|ts| RawValue::Timestamp(ts.and_utc()))
        }),
        // Text, varchar and user-defined enums all arrive as UTF-8 labels.
        _ => row
            .try_get_unchecked::<Option<String>, _>(index)
            .map(|value| value.map(RawValue::Text)),
    };

    match decoded {
        Ok(Some(value)) => value,
        Ok(None) => RawValue::Null,
        Err(err) => {
            warn!(column = index, type_name, error = %err, "undecodable cell treated as null");
            RawValue::Null
        }
    }
}
