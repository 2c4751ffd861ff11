use super::views::{MonthlyPoint, ProvinceEntry, ProvinceSeries, ProvinceValue, TableSummaryView};
use crate::listings::{DomainTable, Listing, PropertyDomain};
use chrono::Datelike;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default, Clone)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn add_optional(&mut self, value: Option<f64>) {
        if let Some(value) = value {
            self.add(value);
        }
    }

    /// Half-way means go to the even neighbour.
    fn rounded(&self) -> Option<i64> {
        (self.count > 0).then(|| (self.sum / self.count as f64).round_ties_even() as i64)
    }
}

/// Province mean a series is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvinceMetric {
    Area,
    Price,
    PricePerM2,
}

impl ProvinceMetric {
    fn of(self, entry: &ProvinceEntry) -> Option<i64> {
        match self {
            Self::Area => Some(entry.mean_area),
            Self::Price => Some(entry.mean_price),
            Self::PricePerM2 => entry.mean_price_per_m2,
        }
    }
}

#[derive(Debug, Default, Clone)]
struct MonthBucket {
    offers: usize,
    price: Mean,
    price_per_m2: Mean,
}

#[derive(Debug, Default, Clone)]
struct ProvinceBucket {
    offers: usize,
    area: Mean,
    price: Mean,
    price_per_m2: Mean,
}

/// Aggregates the dashboard draws for one (possibly filtered) table.
#[derive(Debug, Clone)]
pub struct TableSummary {
    pub domain: PropertyDomain,
    pub rows: usize,
    months: BTreeMap<(i32, u32), MonthBucket>,
    provinces: HashMap<String, ProvinceBucket>,
}

impl TableSummary {
    pub fn for_table(table: &DomainTable) -> Self {
        match table {
            DomainTable::Lands(rows) => Self::from_rows(rows),
            DomainTable::Houses(rows) => Self::from_rows(rows),
            DomainTable::Apartments(rows) => Self::from_rows(rows),
        }
    }

    pub fn from_rows<L: Listing>(rows: &[L]) -> Self {
        let mut months: BTreeMap<(i32, u32), MonthBucket> = BTreeMap::new();
        let mut provinces: HashMap<String, ProvinceBucket> = HashMap::new();

        for row in rows {
            let created = row.created_on();
            let month = months.entry((created.year(), created.month())).or_default();
            month.offers += 1;
            month.price.add(row.price());
            month.price_per_m2.add_optional(row.price_per_m2());

            if let Some(name) = &row.common().province {
                let province = provinces.entry(name.clone()).or_default();
                province.offers += 1;
                province.area.add(row.area());
                province.price.add(row.price());
                province.price_per_m2.add_optional(row.price_per_m2());
            }
        }

        Self {
            domain: L::DOMAIN,
            rows: rows.len(),
            months,
            provinces,
        }
    }

    /// Chronological, one point per month that has at least one offer.
    pub fn monthly_trend(&self) -> Vec<MonthlyPoint> {
        self.months
            .iter()
            .map(|(&(year, month), bucket)| MonthlyPoint {
                month: format!("{year:04}-{month:02}"),
                offers: bucket.offers,
                mean_price: bucket.price.rounded().unwrap_or_default(),
                mean_price_per_m2: bucket.price_per_m2.rounded(),
            })
            .collect()
    }

    /// Ascending by mean price; ties fall back to the province name.
    pub fn province_breakdown(&self) -> Vec<ProvinceEntry> {
        self.province_breakdown_by(ProvinceMetric::Price)
    }

    /// Ascending by `metric`; ties fall back to the province name. Provinces
    /// without a value for the metric go last.
    pub fn province_breakdown_by(&self, metric: ProvinceMetric) -> Vec<ProvinceEntry> {
        let mut entries: Vec<ProvinceEntry> = self
            .provinces
            .iter()
            .map(|(province, bucket)| ProvinceEntry {
                province: province.clone(),
                offers: bucket.offers,
                mean_area: bucket.area.rounded().unwrap_or_default(),
                mean_price: bucket.price.rounded().unwrap_or_default(),
                mean_price_per_m2: bucket.price_per_m2.rounded(),
            })
            .collect();

        entries.sort_by(|left, right| {
            let order = match (metric.of(left), metric.of(right)) {
                (Some(left), Some(right)) => left.cmp(&right),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            order.then_with(|| left.province.cmp(&right.province))
        });
        entries
    }

    /// One independently sorted series per metric, as the province bar
    /// charts draw them.
    pub fn province_series(&self) -> ProvinceSeries {
        let series = |metric: ProvinceMetric| -> Vec<ProvinceValue> {
            self.province_breakdown_by(metric)
                .into_iter()
                .filter_map(|entry| {
                    metric.of(&entry).map(|value| ProvinceValue {
                        province: entry.province,
                        value,
                    })
                })
                .collect()
        };
        ProvinceSeries {
            area: series(ProvinceMetric::Area),
            price: series(ProvinceMetric::Price),
            price_per_m2: series(ProvinceMetric::PricePerM2),
        }
    }

    pub fn summary(&self) -> TableSummaryView {
        TableSummaryView {
            domain: self.domain,
            domain_label: self.domain.label(),
            rows: self.rows,
            monthly_trend: self.monthly_trend(),
            provinces: self.province_breakdown(),
            province_series: self.province_series(),
        }
    }
}

pub fn monthly_trend<L: Listing>(rows: &[L]) -> Vec<MonthlyPoint> {
    TableSummary::from_rows(rows).monthly_trend()
}

pub fn province_breakdown<L: Listing>(rows: &[L]) -> Vec<ProvinceEntry> {
    TableSummary::from_rows(rows).province_breakdown()
}
