use super::{DateRange, ListingFilter, NumericRange};
use crate::listings::{DomainTable, Listing, Location, Market, PropertyDomain};
use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::collections::BTreeSet;

/// Days before today covered by the initial date window.
pub const DEFAULT_WINDOW_DAYS: u64 = 90;

/// Initial filter values for a table: the full extent of every numeric
/// column, the trailing date window and every category seen in the data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterDefaults {
    pub domain: PropertyDomain,
    pub price: NumericRange<f64>,
    pub area: NumericRange<f64>,
    pub price_per_m2: NumericRange<f64>,
    #[serde(skip_serializing_if = "NumericRange::is_open")]
    pub build_year: NumericRange<i32>,
    pub created: DateRange,
    pub locations: Vec<Location>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub markets: Vec<Market>,
    pub provinces: Vec<String>,
}

impl FilterDefaults {
    pub fn for_table(table: &DomainTable, today: NaiveDate) -> Self {
        match table {
            DomainTable::Lands(rows) => Self::from_rows(PropertyDomain::Lands, rows, today),
            DomainTable::Houses(rows) => Self::from_rows(PropertyDomain::Houses, rows, today),
            DomainTable::Apartments(rows) => {
                Self::from_rows(PropertyDomain::Apartments, rows, today)
            }
        }
    }

    fn from_rows<L: Listing>(domain: PropertyDomain, rows: &[L], today: NaiveDate) -> Self {
        let window_start = today
            .checked_sub_days(Days::new(DEFAULT_WINDOW_DAYS))
            .unwrap_or(NaiveDate::MIN);

        let mut locations = BTreeSet::new();
        let mut markets = BTreeSet::new();
        let mut provinces = BTreeSet::new();
        for row in rows {
            let common = row.common();
            locations.insert(common.location);
            if let Some(market) = row.market() {
                markets.insert(market);
            }
            if let Some(province) = &common.province {
                provinces.insert(province.clone());
            }
        }

        Self {
            domain,
            price: extent(rows.iter().map(|row| row.price())),
            area: extent(rows.iter().map(|row| row.area())),
            price_per_m2: extent(rows.iter().filter_map(|row| row.price_per_m2())),
            build_year: extent(rows.iter().filter_map(|row| row.build_year())),
            created: DateRange::between(window_start, today),
            locations: locations.into_iter().collect(),
            markets: markets.into_iter().collect(),
            provinces: provinces.into_iter().collect(),
        }
    }

    /// The filter the dashboard applies before the user touches anything.
    ///
    /// Province filtering starts switched off. Market and `price_per_m2` are
    /// left open so rows with a missing value stay visible.
    pub fn to_filter(&self) -> ListingFilter {
        ListingFilter::new()
            .price(self.price)
            .area(self.area)
            .build_year(self.build_year)
            .created(self.created)
            .locations(self.locations.iter().copied())
    }
}

fn extent<T, I>(values: I) -> NumericRange<T>
where
    T: PartialOrd + Copy,
    I: IntoIterator<Item = T>,
{
    values.into_iter().fold(NumericRange::default(), |range, value| {
        NumericRange {
            min: Some(match range.min {
                Some(min) if min <= value => min,
                _ => value,
            }),
            max: Some(match range.max {
                Some(max) if max >= value => max,
                _ => value,
            }),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{day, house, land};
    use super::*;

    #[test]
    fn defaults_cover_the_whole_table_except_the_date_window() {
        let table = DomainTable::Lands(vec![
            land(90_000.0, 900.0, day(2024, 1, 10)),
            land(210_000.0, 1_400.0, day(2024, 3, 10)),
        ]);
        let today = day(2024, 3, 31);

        let defaults = FilterDefaults::for_table(&table, today);
        assert_eq!(defaults.price, NumericRange::between(90_000.0, 210_000.0));
        assert_eq!(defaults.area, NumericRange::between(900.0, 1_400.0));
        assert!(defaults.build_year.is_open());
        assert_eq!(defaults.created, DateRange::between(day(2024, 1, 1), today));
        assert_eq!(defaults.locations, vec![Location::Suburbs]);
        assert_eq!(defaults.provinces, vec!["mazowieckie".to_string()]);

        let filter = defaults.to_filter();
        assert!(filter.province.is_none());
        assert_eq!(filter.apply(&table).len(), 2);
    }

    #[test]
    fn house_defaults_carry_years_and_markets() {
        let table = DomainTable::Houses(vec![
            house(400_000.0, 1985, Some(Market::Secondary)),
            house(650_000.0, 2019, Some(Market::Primary)),
            house(720_000.0, 2022, None),
        ]);

        let defaults = FilterDefaults::for_table(&table, day(2024, 4, 1));
        assert_eq!(defaults.build_year, NumericRange::between(1985, 2022));
        assert_eq!(defaults.markets, vec![Market::Primary, Market::Secondary]);
        assert_eq!(defaults.to_filter().apply(&table).len(), 3);
    }

    #[test]
    fn empty_table_has_open_extents() {
        let table = DomainTable::empty(PropertyDomain::Apartments);
        let defaults = FilterDefaults::for_table(&table, day(2024, 1, 1));
        assert!(defaults.price.is_open());
        assert!(defaults.locations.is_empty());
    }
}
