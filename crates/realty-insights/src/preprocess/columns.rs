use super::SchemaMismatch;
use crate::listings::PropertyDomain;
use crate::source::{RawRowSet, RawValue};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::HashMap;

static NULL: RawValue = RawValue::Null;

/// Required columns of a row set resolved to their positions.
pub(crate) struct Projection<'a> {
    domain: PropertyDomain,
    rows: &'a RawRowSet,
    indices: HashMap<&'static str, usize>,
}

impl<'a> Projection<'a> {
    pub(crate) fn resolve(
        domain: PropertyDomain,
        rows: &'a RawRowSet,
        columns: &'static [&'static str],
    ) -> Result<Self, SchemaMismatch> {
        let indices = columns
            .iter()
            .map(|column| {
                rows.column_index(column)
                    .map(|index| (*column, index))
                    .ok_or_else(|| {
                        SchemaMismatch::new(domain, *column, "required column is missing")
                    })
            })
            .collect::<Result<HashMap<_, _>, _>>()?;

        Ok(Self {
            domain,
            rows,
            indices,
        })
    }

    pub(crate) fn rows(&self) -> impl Iterator<Item = RowView<'_>> {
        self.rows
            .rows()
            .iter()
            .enumerate()
            .map(move |(position, values)| RowView {
                projection: self,
                position,
                values,
            })
    }
}

/// Typed access to one raw row through a [`Projection`].
pub(crate) struct RowView<'a> {
    projection: &'a Projection<'a>,
    position: usize,
    values: &'a [RawValue],
}

impl<'a> RowView<'a> {
    /// Cell of a projected column; columns outside the projection read as null.
    pub(crate) fn raw(&self, column: &'static str) -> &'a RawValue {
        self.projection
            .indices
            .get(column)
            .and_then(|index| self.values.get(*index))
            .unwrap_or(&NULL)
    }

    /// Null, blank text and NaN all count as a missing value.
    pub(crate) fn is_blank(&self, column: &'static str) -> bool {
        match self.raw(column) {
            RawValue::Null => true,
            RawValue::Float(value) => value.is_nan(),
            RawValue::Text(value) => {
                let trimmed = value.trim();
                trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan")
            }
            _ => false,
        }
    }

    pub(crate) fn mismatch(
        &self,
        column: &'static str,
        detail: impl AsRef<str>,
    ) -> SchemaMismatch {
        SchemaMismatch::new(
            self.projection.domain,
            column,
            format!("row {}: {}", self.position, detail.as_ref()),
        )
    }

    pub(crate) fn text(&self, column: &'static str) -> Result<String, SchemaMismatch> {
        self.optional_text(column)
            .ok_or_else(|| self.mismatch(column, "null value in required column"))
    }

    pub(crate) fn optional_text(&self, column: &'static str) -> Option<String> {
        match self.raw(column) {
            RawValue::Null => None,
            RawValue::Bool(value) => Some(value.to_string()),
            RawValue::Int(value) => Some(value.to_string()),
            RawValue::Float(value) => Some(value.to_string()),
            RawValue::Text(value) => {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            RawValue::Timestamp(value) => Some(value.to_rfc3339()),
        }
    }

    pub(crate) fn number(&self, column: &'static str) -> Result<f64, SchemaMismatch> {
        self.optional_number(column)?
            .ok_or_else(|| self.mismatch(column, "null value in required column"))
    }

    /// Numeric cell; blanks and NaN read as null, infinities are rejected.
    pub(crate) fn optional_number(
        &self,
        column: &'static str,
    ) -> Result<Option<f64>, SchemaMismatch> {
        let value = match self.raw(column) {
            RawValue::Null => return Ok(None),
            RawValue::Int(value) => *value as f64,
            RawValue::Float(value) => *value,
            RawValue::Text(value) => {
                let trimmed = value.trim();
                if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
                    return Ok(None);
                }
                trimmed.parse::<f64>().map_err(|_| {
                    self.mismatch(column, format!("expected a number, found '{trimmed}'"))
                })?
            }
            other => {
                return Err(self.mismatch(
                    column,
                    format!("expected a number, found {}", other.type_name()),
                ))
            }
        };

        if value.is_nan() {
            Ok(None)
        } else if value.is_infinite() {
            Err(self.mismatch(column, "number is not finite"))
        } else {
            Ok(Some(value))
        }
    }

    pub(crate) fn timestamp(
        &self,
        column: &'static str,
    ) -> Result<DateTime<Utc>, SchemaMismatch> {
        match self.raw(column) {
            RawValue::Timestamp(value) => Ok(*value),
            RawValue::Text(value) => parse_timestamp(value).ok_or_else(|| {
                self.mismatch(column, format!("unparseable timestamp '{}'", value.trim()))
            }),
            RawValue::Null => Err(self.mismatch(column, "null value in required column")),
            other => Err(self.mismatch(
                column,
                format!("expected a timestamp, found {}", other.type_name()),
            )),
        }
    }

    /// Whole-number cell; integral floats and numeric text are accepted.
    pub(crate) fn optional_year(
        &self,
        column: &'static str,
    ) -> Result<Option<i32>, SchemaMismatch> {
        let value = match self.raw(column) {
            RawValue::Int(value) => *value as f64,
            RawValue::Text(value) if value.trim().is_empty() => return Ok(None),
            RawValue::Text(value) => value.trim().parse::<f64>().map_err(|_| {
                self.mismatch(column, format!("expected a year, found '{}'", value.trim()))
            })?,
            RawValue::Float(value) if value.is_nan() => return Ok(None),
            RawValue::Float(value) => *value,
            RawValue::Null => return Ok(None),
            other => {
                return Err(self.mismatch(
                    column,
                    format!("expected a year, found {}", other.type_name()),
                ))
            }
        };

        if !value.is_finite() || value.fract() != 0.0 || value.abs() > i32::MAX as f64 {
            return Err(self.mismatch(column, format!("{value} is not a whole year")));
        }

        Ok(Some(value as i32))
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%d %H:%M:%S%#z"] {
        if let Ok(dt) = DateTime::parse_from_str(trimmed, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parse_timestamp_supports_common_export_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-05T10:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05 10:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05 12:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05 10:30:00.000"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-03-05"),
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap())
        );
        assert!(parse_timestamp("  ").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }

    fn single_cell(value: RawValue) -> RawRowSet {
        RawRowSet::new(["build_year"]).with_row([("build_year", value)])
    }

    const YEAR: &[&str] = &["build_year"];

    fn year_of(value: RawValue) -> Result<Option<i32>, SchemaMismatch> {
        let rows = single_cell(value);
        let projection =
            Projection::resolve(PropertyDomain::Houses, &rows, YEAR).expect("resolve");
        let row = projection.rows().next().expect("row");
        row.optional_year("build_year")
    }

    #[test]
    fn year_accepts_integers_integral_floats_and_text() {
        assert_eq!(year_of(RawValue::Int(1990)).unwrap(), Some(1990));
        assert_eq!(year_of(RawValue::Float(1990.0)).unwrap(), Some(1990));
        assert_eq!(year_of(RawValue::from("1990")).unwrap(), Some(1990));
        assert_eq!(year_of(RawValue::from("1990.0")).unwrap(), Some(1990));
        assert_eq!(year_of(RawValue::Null).unwrap(), None);
        assert_eq!(year_of(RawValue::Float(f64::NAN)).unwrap(), None);
        assert!(year_of(RawValue::from("nineteen ninety")).is_err());
        assert!(year_of(RawValue::Float(1990.5)).is_err());
    }

    #[test]
    fn blank_cells_are_null_text_or_nan() {
        const AREA: &[&str] = &["land_area"];
        let rows = RawRowSet::new(["land_area"])
            .with_row([("land_area", RawValue::Null)])
            .with_row([("land_area", RawValue::from(" NaN "))])
            .with_row([("land_area", RawValue::Float(f64::NAN))])
            .with_row([("land_area", RawValue::from("   "))])
            .with_row([("land_area", RawValue::Int(0))]);
        let projection =
            Projection::resolve(PropertyDomain::Lands, &rows, AREA).expect("resolve");

        let blank: Vec<bool> = projection
            .rows()
            .map(|row| row.is_blank("land_area"))
            .collect();
        assert_eq!(blank, [true, true, true, true, false]);
    }

    #[test]
    fn infinite_numbers_are_rejected() {
        const PRICE: &[&str] = &["price"];
        let rows = RawRowSet::new(["price"]).with_row([("price", RawValue::from("inf"))]);
        let projection =
            Projection::resolve(PropertyDomain::Lands, &rows, PRICE).expect("resolve");
        let row = projection.rows().next().expect("row");
        assert!(row.optional_number("price").is_err());
    }

    #[test]
    fn missing_required_column_names_the_column() {
        let rows = RawRowSet::new(["url"]);
        let error = Projection::resolve(PropertyDomain::Lands, &rows, &["url", "price"])
            .err()
            .expect("price is missing");
        assert_eq!(error.column, "price");
        assert_eq!(error.domain, PropertyDomain::Lands);
    }
}
