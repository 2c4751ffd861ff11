use crate::infra::{deserialize_optional_date, AppState, ListingState};
use axum::extract::{Path, Query};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{Local, NaiveDate};
use realty_insights::error::AppError;
use realty_insights::filter::{FilterDefaults, ListingFilter};
use realty_insights::listings::{DomainTable, PropertyDomain};
use realty_insights::loader::LoadReport;
use realty_insights::report::views::TableSummaryView;
use realty_insights::report::TableSummary;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Serialize)]
pub(crate) struct TableResponse {
    pub(crate) columns: &'static [&'static str],
    pub(crate) count: usize,
    #[serde(flatten)]
    pub(crate) table: Arc<DomainTable>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QueryResponse {
    pub(crate) count: usize,
    #[serde(flatten)]
    pub(crate) table: DomainTable,
    pub(crate) summary: TableSummaryView,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DefaultsQuery {
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DefaultsResponse {
    #[serde(flatten)]
    pub(crate) defaults: FilterDefaults,
    pub(crate) filter: ListingFilter,
}

pub(crate) fn with_listing_routes(state: ListingState) -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/listings/reload", post(reload_endpoint))
        .route("/api/v1/listings/:domain", get(table_endpoint))
        .route("/api/v1/listings/:domain/query", post(query_endpoint))
        .route("/api/v1/listings/:domain/defaults", get(defaults_endpoint))
        .layer(Extension(state))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

async fn cached_table(
    state: &ListingState,
    headers: &HeaderMap,
    raw_domain: &str,
) -> Result<Arc<DomainTable>, AppError> {
    let domain = raw_domain.parse::<PropertyDomain>()?;
    let cache = state.session(headers);
    Ok(cache.get_or_load(&state.loader, domain).await?)
}

pub(crate) async fn table_endpoint(
    Extension(state): Extension<ListingState>,
    headers: HeaderMap,
    Path(domain): Path<String>,
) -> Result<Json<TableResponse>, AppError> {
    let table = cached_table(&state, &headers, &domain).await?;
    Ok(Json(TableResponse {
        columns: table.columns(),
        count: table.len(),
        table,
    }))
}

pub(crate) async fn query_endpoint(
    Extension(state): Extension<ListingState>,
    headers: HeaderMap,
    Path(domain): Path<String>,
    Json(filter): Json<ListingFilter>,
) -> Result<Json<QueryResponse>, AppError> {
    let table = cached_table(&state, &headers, &domain).await?;
    let selected = filter.apply(&table);
    let summary = TableSummary::for_table(&selected).summary();

    Ok(Json(QueryResponse {
        count: selected.len(),
        table: selected,
        summary,
    }))
}

pub(crate) async fn defaults_endpoint(
    Extension(state): Extension<ListingState>,
    headers: HeaderMap,
    Path(domain): Path<String>,
    Query(query): Query<DefaultsQuery>,
) -> Result<Json<DefaultsResponse>, AppError> {
    let table = cached_table(&state, &headers, &domain).await?;
    let today = query.today.unwrap_or_else(|| Local::now().date_naive());
    let defaults = FilterDefaults::for_table(&table, today);

    Ok(Json(DefaultsResponse {
        filter: defaults.to_filter(),
        defaults,
    }))
}

pub(crate) async fn reload_endpoint(
    Extension(state): Extension<ListingState>,
    headers: HeaderMap,
) -> Result<Json<LoadReport>, AppError> {
    let cache = state.session(&headers);
    let report = cache.reload(&state.loader).await?;
    info!(
        elapsed_ms = report.elapsed_ms,
        complete = report.is_complete(),
        "listings reloaded on request"
    );
    Ok(Json(report))
}
