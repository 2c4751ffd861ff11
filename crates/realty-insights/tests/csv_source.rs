use realty_insights::cache::SessionCache;
use realty_insights::filter::{ListingFilter, NumericRange};
use realty_insights::listings::{Location, PropertyDomain};
use realty_insights::loader::{ConcurrentLoader, ExecutionBackend};
use realty_insights::report::TableSummary;
use realty_insights::source::CsvDirectorySource;
use std::path::PathBuf;
use std::sync::Arc;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

#[tokio::test]
async fn exported_tables_load_and_filter_end_to_end() {
    let source = CsvDirectorySource::new(fixtures_dir());
    let loader = ConcurrentLoader::new(Arc::new(source), ExecutionBackend::Tasks);
    let cache = SessionCache::new();

    let report = loader.load_into(&cache).await.expect("fixtures load");
    assert!(report.is_complete());

    let lands = cache.get(PropertyDomain::Lands).expect("lands cached");
    assert_eq!(lands.len(), 4);
    let rows = lands.lands().expect("lands table");
    assert_eq!(rows[3].common.location, Location::NoData);
    assert_eq!(rows[3].common.province, None);
    assert_eq!(rows[3].common.latitude, None);

    let filter = ListingFilter::new().price(NumericRange::between(100_000.0, 200_000.0));
    let selected = filter.apply(&lands);
    let prices: Vec<f64> = selected
        .lands()
        .expect("lands table")
        .iter()
        .map(|land| land.common.price)
        .collect();
    assert_eq!(prices, [150_000.0, 120_000.0]);

    let houses = cache.get(PropertyDomain::Houses).expect("houses cached");
    let years: Vec<i32> = houses
        .houses()
        .expect("houses table")
        .iter()
        .map(|house| house.build_year)
        .collect();
    assert_eq!(years, [1990, 2018]);

    let apartments = cache.get(PropertyDomain::Apartments).expect("apartments cached");
    let summary = TableSummary::for_table(&apartments).summary();
    assert_eq!(summary.rows, 2);
    assert_eq!(summary.monthly_trend.len(), 1);
    assert_eq!(summary.monthly_trend[0].month, "2024-03");
    assert_eq!(summary.provinces[0].province, "lodzkie");
}
