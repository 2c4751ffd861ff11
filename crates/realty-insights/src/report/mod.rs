mod summary;
pub mod views;

pub use summary::{monthly_trend, province_breakdown, ProvinceMetric, TableSummary};
