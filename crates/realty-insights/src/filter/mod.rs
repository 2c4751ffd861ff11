//! Multi-predicate row selection over canonical tables.
//!
//! Every predicate of a [`ListingFilter`] is optional and they are AND-ed, so
//! the result never depends on the order they are applied in. Selection keeps
//! the table's row order. An empty selection is a valid answer.

mod bounds;

pub use bounds::FilterDefaults;

use crate::listings::{DomainTable, Listing, Location, Market};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Inclusive range with optional ends. `min > max` admits nothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericRange<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<T>,
}

impl<T> Default for NumericRange<T> {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
        }
    }
}

impl<T: PartialOrd + Copy> NumericRange<T> {
    pub fn between(min: T, max: T) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn at_least(min: T) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub fn at_most(max: T) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    pub fn is_open(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, value: T) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }

    /// An open range admits anything, including a missing value; a bounded
    /// range never admits a missing value.
    pub fn admits(&self, value: Option<T>) -> bool {
        if self.is_open() {
            return true;
        }
        value.is_some_and(|value| self.contains(value))
    }
}

/// Inclusive range of calendar days on `created_at`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<NaiveDate>,
}

impl DateRange {
    pub fn between(after: NaiveDate, before: NaiveDate) -> Self {
        Self {
            after: Some(after),
            before: Some(before),
        }
    }

    pub fn is_open(&self) -> bool {
        self.after.is_none() && self.before.is_none()
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.after.map_or(true, |after| day >= after)
            && self.before.map_or(true, |before| day <= before)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingFilter {
    pub price: NumericRange<f64>,
    pub area: NumericRange<f64>,
    pub price_per_m2: NumericRange<f64>,
    pub build_year: NumericRange<i32>,
    pub created: DateRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<BTreeSet<Location>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market: Option<BTreeSet<Market>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<BTreeSet<String>>,
}

impl ListingFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn price(mut self, range: NumericRange<f64>) -> Self {
        self.price = range;
        self
    }

    pub fn area(mut self, range: NumericRange<f64>) -> Self {
        self.area = range;
        self
    }

    pub fn price_per_m2(mut self, range: NumericRange<f64>) -> Self {
        self.price_per_m2 = range;
        self
    }

    pub fn build_year(mut self, range: NumericRange<i32>) -> Self {
        self.build_year = range;
        self
    }

    pub fn created(mut self, range: DateRange) -> Self {
        self.created = range;
        self
    }

    pub fn locations(mut self, locations: impl IntoIterator<Item = Location>) -> Self {
        self.location = Some(locations.into_iter().collect());
        self
    }

    pub fn markets(mut self, markets: impl IntoIterator<Item = Market>) -> Self {
        self.market = Some(markets.into_iter().collect());
        self
    }

    pub fn provinces<S: Into<String>>(mut self, provinces: impl IntoIterator<Item = S>) -> Self {
        self.province = Some(provinces.into_iter().map(Into::into).collect());
        self
    }

    /// True when no predicate is set.
    pub fn is_unrestricted(&self) -> bool {
        self.price.is_open()
            && self.area.is_open()
            && self.price_per_m2.is_open()
            && self.build_year.is_open()
            && self.created.is_open()
            && self.location.is_none()
            && self.market.is_none()
            && self.province.is_none()
    }

    pub fn matches<L: Listing>(&self, row: &L) -> bool {
        let common = row.common();

        self.price.contains(common.price)
            && self.area.contains(row.area())
            && self.price_per_m2.admits(row.price_per_m2())
            && self.build_year.admits(row.build_year())
            && self.created.contains(row.created_on())
            && self
                .location
                .as_ref()
                .map_or(true, |allowed| allowed.contains(&common.location))
            && self.market.as_ref().map_or(true, |allowed| {
                row.market().is_some_and(|market| allowed.contains(&market))
            })
            && self.province.as_ref().map_or(true, |allowed| {
                common
                    .province
                    .as_ref()
                    .is_some_and(|province| allowed.contains(province))
            })
    }

    /// Rows of `rows` that satisfy every predicate, in their original order.
    pub fn select<L: Listing + Clone>(&self, rows: &[L]) -> Vec<L> {
        rows.iter().filter(|row| self.matches(*row)).cloned().collect()
    }

    pub fn count<L: Listing>(&self, rows: &[L]) -> usize {
        rows.iter().filter(|row| self.matches(*row)).count()
    }

    pub fn apply(&self, table: &DomainTable) -> DomainTable {
        match table {
            DomainTable::Lands(rows) => DomainTable::Lands(self.select(rows)),
            DomainTable::Houses(rows) => DomainTable::Houses(self.select(rows)),
            DomainTable::Apartments(rows) => DomainTable::Apartments(self.select(rows)),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{day, house, land};
    use super::*;
    use crate::listings::PropertyDomain;

    fn lands() -> Vec<crate::listings::LandListing> {
        vec![
            land(90_000.0, 900.0, day(2024, 1, 10)),
            land(150_000.0, 1_000.0, day(2024, 2, 10)),
            land(210_000.0, 1_400.0, day(2024, 3, 10)),
        ]
    }

    #[test]
    fn price_range_is_inclusive_and_keeps_only_matching_lands() {
        let filter = ListingFilter::new().price(NumericRange::between(100_000.0, 200_000.0));
        let selected = filter.select(&lands());
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].common.price, 150_000.0);

        let edges = ListingFilter::new().price(NumericRange::between(90_000.0, 210_000.0));
        assert_eq!(edges.count(&lands()), 3);
    }

    #[test]
    fn unrestricted_filter_is_identity() {
        let filter = ListingFilter::new();
        assert!(filter.is_unrestricted());
        assert_eq!(filter.select(&lands()), lands());
    }

    #[test]
    fn adding_a_predicate_never_grows_the_result() {
        let rows = lands();
        let base = ListingFilter::new().price(NumericRange::at_least(100_000.0));
        let narrowed = base
            .clone()
            .created(DateRange::between(day(2024, 3, 1), day(2024, 3, 31)));

        let wide = base.select(&rows);
        let narrow = narrowed.select(&rows);
        assert!(narrow.len() <= wide.len());
        assert!(narrow.iter().all(|row| wide.contains(row)));
        assert!(narrow.iter().all(|row| narrowed.matches(row)));
    }

    #[test]
    fn inverted_range_selects_nothing() {
        let filter = ListingFilter::new().area(NumericRange::between(2_000.0, 500.0));
        assert!(filter.select(&lands()).is_empty());
    }

    #[test]
    fn date_range_compares_calendar_days() {
        let single_day = DateRange::between(day(2024, 2, 10), day(2024, 2, 10));
        let filter = ListingFilter::new().created(single_day);
        let selected = filter.select(&lands());
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].common.price, 150_000.0);
    }

    #[test]
    fn predicate_on_missing_dimension_excludes_the_row() {
        let by_year = ListingFilter::new().build_year(NumericRange::at_least(1900));
        assert!(by_year.select(&lands()).is_empty());

        let by_market = ListingFilter::new().markets([Market::Primary]);
        assert!(by_market.select(&lands()).is_empty());
    }

    #[test]
    fn house_predicates_combine() {
        let houses = vec![
            house(400_000.0, 1985, Some(Market::Secondary)),
            house(650_000.0, 2019, Some(Market::Primary)),
            house(700_000.0, 2021, None),
        ];

        let filter = ListingFilter::new()
            .build_year(NumericRange::at_least(2000))
            .markets([Market::Primary]);
        let selected = filter.select(&houses);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].build_year, 2019);
    }

    #[test]
    fn province_and_location_sets_restrict_membership() {
        let rows = lands();
        assert_eq!(
            ListingFilter::new().provinces(["mazowieckie"]).count(&rows),
            3
        );
        assert_eq!(ListingFilter::new().provinces(["opolskie"]).count(&rows), 0);
        assert_eq!(
            ListingFilter::new()
                .locations([Location::City, Location::NoData])
                .count(&rows),
            0
        );
    }

    #[test]
    fn apply_keeps_the_domain_tag() {
        let table = DomainTable::Lands(lands());
        let filtered = ListingFilter::new()
            .price(NumericRange::at_most(100_000.0))
            .apply(&table);
        assert_eq!(filtered.domain(), PropertyDomain::Lands);
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn filter_deserializes_from_sparse_json() {
        let filter: ListingFilter = serde_json::from_value(serde_json::json!({
            "price": { "min": 100000 },
            "location": ["Suburbs", "<no data>"],
        }))
        .expect("filter json");
        assert_eq!(filter.price, NumericRange::at_least(100_000.0));
        assert_eq!(filter.location.map(|set| set.len()), Some(2));
        assert!(filter.created.is_open());
    }
}
