//! Per-domain transformation of raw row sets into canonical tables.
//!
//! Each domain has its own [`Preprocess`] implementation; [`preprocess`]
//! selects one from the [`PropertyDomain`] tag. All variants are pure: the
//! same raw rows always produce the same table.

mod apartments;
mod columns;
mod houses;
mod lands;
mod normalizer;

pub use apartments::ApartmentsPreprocessor;
pub use houses::HousesPreprocessor;
pub use lands::LandsPreprocessor;

use crate::listings::{DomainTable, ListingCommon, PropertyDomain};
use crate::source::RawRowSet;
use columns::RowView;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Raw rows do not carry a column, or carry a value of the wrong type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("schema mismatch in {domain} column '{column}': {detail}")]
pub struct SchemaMismatch {
    pub domain: PropertyDomain,
    pub column: String,
    pub detail: String,
}

impl SchemaMismatch {
    pub fn new(
        domain: PropertyDomain,
        column: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            domain,
            column: column.into(),
            detail: detail.into(),
        }
    }
}

/// Transformation of one domain's raw rows into canonical records.
pub trait Preprocess {
    type Record;

    const DOMAIN: PropertyDomain;

    /// Raw columns the domain projects; any other column is ignored.
    const REQUIRED_COLUMNS: &'static [&'static str];

    fn transform(rows: &RawRowSet) -> Result<Vec<Self::Record>, SchemaMismatch>;
}

/// Run the preprocessor selected by `domain`.
pub fn preprocess(
    domain: PropertyDomain,
    rows: &RawRowSet,
) -> Result<DomainTable, SchemaMismatch> {
    let table = match domain {
        PropertyDomain::Lands => DomainTable::Lands(LandsPreprocessor::transform(rows)?),
        PropertyDomain::Houses => DomainTable::Houses(HousesPreprocessor::transform(rows)?),
        PropertyDomain::Apartments => {
            DomainTable::Apartments(ApartmentsPreprocessor::transform(rows)?)
        }
    };

    Ok(table)
}

const CREATED_AT: &str = "utc_created_at";

/// Cells a row cannot be listed without. Rows missing one are skipped rather
/// than failing the domain.
const LISTING_CELLS: [&str; 3] = ["url", "price", CREATED_AT];

fn is_incomplete(row: &RowView<'_>, area_column: &'static str) -> bool {
    row.is_blank(area_column) || LISTING_CELLS.iter().any(|column| row.is_blank(column))
}

fn log_dropped(domain: PropertyDomain, raw_rows: usize, kept: usize, reason: &str) {
    let dropped = raw_rows - kept;
    if dropped > 0 {
        debug!(%domain, dropped, reason, "dropped incomplete listing rows");
    }
}

fn common_fields(row: &RowView<'_>) -> Result<ListingCommon, SchemaMismatch> {
    Ok(ListingCommon {
        url: row.text("url")?,
        price: row.number("price")?,
        created_at: row.timestamp(CREATED_AT)?,
        province: row.optional_text("province"),
        location: normalizer::remap_location(row.raw("location")),
        latitude: row.optional_number("latitude")?,
        longitude: row.optional_number("longitude")?,
    })
}


#[cfg(test)]
mod tests {
    use super::fixtures::{raw_row, row_set};
    use super::*;
    use crate::source::RawValue;

    #[test]
    fn output_columns_match_canonical_schema_for_every_domain() {
        for domain in PropertyDomain::ordered() {
            let rows = row_set(vec![raw_row(&[
                (domain.area_column(), RawValue::Float(100.0)),
                ("build_year", RawValue::Int(2001)),
                ("market", RawValue::from("SECONDARY")),
                ("lot_area", RawValue::Float(800.0)),
                ("unrelated", RawValue::from("ignored")),
            ])]);

            let table = preprocess(domain, &rows).expect("preprocess succeeds");
            assert_eq!(table.domain(), domain);

            let value = serde_json::to_value(&table).expect("serialize");
            let record = value["rows"][0].as_object().expect("record object");
            let mut keys: Vec<&str> = record.keys().map(String::as_str).collect();
            let mut expected = domain.canonical_columns().to_vec();
            keys.sort_unstable();
            expected.sort_unstable();
            assert_eq!(keys, expected, "{domain} schema");
        }
    }

    #[test]
    fn missing_required_column_fails_even_without_rows() {
        for domain in PropertyDomain::ordered() {
            let rows = RawRowSet::new(["url", "price", "utc_created_at"]);
            let error = preprocess(domain, &rows).expect_err("columns are missing");
            assert_eq!(error.domain, domain);
        }
    }

    #[test]
    fn rows_without_price_or_area_are_skipped_in_every_domain() {
        for domain in PropertyDomain::ordered() {
            let rows = row_set(vec![
                raw_row(&[
                    ("url", RawValue::from("https://kept")),
                    (domain.area_column(), RawValue::Float(100.0)),
                    ("build_year", RawValue::Int(2001)),
                    ("market", RawValue::Null),
                    ("lot_area", RawValue::Null),
                ]),
                raw_row(&[
                    ("price", RawValue::Null),
                    (domain.area_column(), RawValue::Float(100.0)),
                    ("build_year", RawValue::Int(2001)),
                    ("market", RawValue::Null),
                    ("lot_area", RawValue::Null),
                ]),
                raw_row(&[
                    (domain.area_column(), RawValue::from("")),
                    ("build_year", RawValue::Int(2001)),
                    ("market", RawValue::Null),
                    ("lot_area", RawValue::Null),
                ]),
            ]);

            let table = preprocess(domain, &rows).expect("incomplete rows are not fatal");
            assert_eq!(table.len(), 1, "{domain}");
        }
    }

    #[test]
    fn non_numeric_price_is_schema_mismatch() {
        let rows = row_set(vec![raw_row(&[
            ("price", RawValue::from("call for price")),
            ("land_area", RawValue::Float(1000.0)),
        ])]);
        let error = preprocess(PropertyDomain::Lands, &rows).expect_err("price is text");
        assert_eq!(error.column, "price");
        assert!(error.detail.contains("row 0"));
    }
}
