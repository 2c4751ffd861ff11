use crate::listings::PropertyDomain;
use serde::Serialize;

/// Offers created in one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPoint {
    /// `YYYY-MM`.
    pub month: String,
    pub offers: usize,
    pub mean_price: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_price_per_m2: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvinceEntry {
    pub province: String,
    pub offers: usize,
    pub mean_area: i64,
    pub mean_price: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_price_per_m2: Option<i64>,
}

/// One bar of a province chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvinceValue {
    pub province: String,
    pub value: i64,
}

/// Province means split per metric, each ascending by its own value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProvinceSeries {
    pub area: Vec<ProvinceValue>,
    pub price: Vec<ProvinceValue>,
    pub price_per_m2: Vec<ProvinceValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummaryView {
    pub domain: PropertyDomain,
    pub domain_label: &'static str,
    pub rows: usize,
    pub monthly_trend: Vec<MonthlyPoint>,
    pub provinces: Vec<ProvinceEntry>,
    pub province_series: ProvinceSeries,
}
