use crate::infra::{build_loader, parse_date};
use chrono::{Local, NaiveDate};
use clap::Args;
use realty_insights::cache::SessionCache;
use realty_insights::config::AppConfig;
use realty_insights::error::AppError;
use realty_insights::filter::{DateRange, FilterDefaults, ListingFilter, NumericRange};
use realty_insights::listings::{DomainTable, Location, Market, PropertyDomain};
use realty_insights::report::views::TableSummaryView;
use realty_insights::report::TableSummary;
use realty_insights::telemetry;
use serde::Serialize;

#[derive(Args, Debug)]
pub(crate) struct QueryArgs {
    /// Domain to query: lands, houses or apartments
    pub(crate) domain: PropertyDomain,
    /// Start from the dashboard defaults (full extents, last 90 days)
    #[arg(long)]
    pub(crate) defaults: bool,
    /// Reference day for the default date window (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    #[arg(long)]
    pub(crate) min_price: Option<f64>,
    #[arg(long)]
    pub(crate) max_price: Option<f64>,
    #[arg(long)]
    pub(crate) min_area: Option<f64>,
    #[arg(long)]
    pub(crate) max_area: Option<f64>,
    #[arg(long)]
    pub(crate) min_price_per_m2: Option<f64>,
    #[arg(long)]
    pub(crate) max_price_per_m2: Option<f64>,
    /// Houses only
    #[arg(long)]
    pub(crate) min_year: Option<i32>,
    /// Houses only
    #[arg(long)]
    pub(crate) max_year: Option<i32>,
    /// Offers added on or after this day (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) after: Option<NaiveDate>,
    /// Offers added on or before this day (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) before: Option<NaiveDate>,
    /// Repeatable; Suburbs, Country, City or "<no data>"
    #[arg(long = "location")]
    pub(crate) locations: Vec<Location>,
    /// Repeatable; houses only
    #[arg(long = "market")]
    pub(crate) markets: Vec<Market>,
    /// Repeatable
    #[arg(long = "province")]
    pub(crate) provinces: Vec<String>,
    /// Print rows and summary as JSON instead of a text report
    #[arg(long)]
    pub(crate) json: bool,
}

impl QueryArgs {
    /// Flags override the starting filter one predicate at a time.
    pub(crate) fn filter(&self, start: ListingFilter) -> ListingFilter {
        let mut filter = start;
        override_range(&mut filter.price, self.min_price, self.max_price);
        override_range(&mut filter.area, self.min_area, self.max_area);
        override_range(
            &mut filter.price_per_m2,
            self.min_price_per_m2,
            self.max_price_per_m2,
        );
        override_range(&mut filter.build_year, self.min_year, self.max_year);
        if self.after.is_some() || self.before.is_some() {
            filter.created = DateRange {
                after: self.after.or(filter.created.after),
                before: self.before.or(filter.created.before),
            };
        }
        if !self.locations.is_empty() {
            filter = filter.locations(self.locations.iter().copied());
        }
        if !self.markets.is_empty() {
            filter = filter.markets(self.markets.iter().copied());
        }
        if !self.provinces.is_empty() {
            filter = filter.provinces(self.provinces.iter().cloned());
        }
        filter
    }
}

fn override_range<T: Copy>(range: &mut NumericRange<T>, min: Option<T>, max: Option<T>) {
    if min.is_some() {
        range.min = min;
    }
    if max.is_some() {
        range.max = max;
    }
}

#[derive(Debug, Serialize)]
struct QueryOutput<'a> {
    filter: &'a ListingFilter,
    count: usize,
    table: &'a DomainTable,
    summary: &'a TableSummaryView,
}

pub(crate) async fn run_query(args: QueryArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let loader = build_loader(&config)?;
    let cache = SessionCache::new();
    let table = cache.get_or_load(&loader, args.domain).await?;

    let start = if args.defaults {
        let today = args.today.unwrap_or_else(|| Local::now().date_naive());
        FilterDefaults::for_table(&table, today).to_filter()
    } else {
        ListingFilter::new()
    };
    let filter = args.filter(start);
    let selected = filter.apply(&table);
    let summary = TableSummary::for_table(&selected).summary();

    if args.json {
        let output = QueryOutput {
            filter: &filter,
            count: selected.len(),
            table: &selected,
            summary: &summary,
        };
        let rendered = serde_json::to_string_pretty(&output).map_err(std::io::Error::from)?;
        println!("{rendered}");
    } else {
        render_summary(table.len(), &summary);
    }
    Ok(())
}

fn render_summary(total: usize, summary: &TableSummaryView) {
    println!("{} listings", summary.domain_label);
    println!("Number of offers: {} of {}", summary.rows, total);

    if summary.rows == 0 {
        println!("There are no offers that match your criteria");
        return;
    }

    println!("\nChange in time");
    for point in &summary.monthly_trend {
        let per_m2 = point
            .mean_price_per_m2
            .map_or_else(|| "n/a".to_string(), |value| value.to_string());
        println!(
            "- {}: {} offers, average price {} PLN, average price per m2 {} PLN/m2",
            point.month, point.offers, point.mean_price, per_m2
        );
    }

    if !summary.provinces.is_empty() {
        println!("\nProvince-wise distribution");
        for entry in &summary.provinces {
            let per_m2 = entry
                .mean_price_per_m2
                .map_or_else(|| "n/a".to_string(), |value| value.to_string());
            println!(
                "- {}: {} offers, average area {} m2, average price {} PLN, {} PLN/m2",
                entry.province, entry.offers, entry.mean_area, entry.mean_price, per_m2
            );
        }

        let series = &summary.province_series;
        for (label, values) in [
            ("area", &series.area),
            ("price", &series.price),
            ("price per m2", &series.price_per_m2),
        ] {
            let ranking: Vec<&str> = values.iter().map(|value| value.province.as_str()).collect();
            println!("Ranked by average {label}: {}", ranking.join(", "));
        }
    }
}
