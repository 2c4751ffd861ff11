use crate::cli::ServeArgs;
use crate::infra::{build_loader, AppState, ListingState, DEFAULT_SESSION};
use crate::routes::with_listing_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use realty_insights::cache::SessionRegistry;
use realty_insights::config::AppConfig;
use realty_insights::error::AppError;
use realty_insights::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let sessions =
        SessionRegistry::with_limits(config.sessions.idle_timeout, config.sessions.max_sessions);
    let listings = ListingState::with_sessions(build_loader(&config)?, sessions);
    info!(
        backend = listings.loader.backend().kind().as_str(),
        policy = ?listings.loader.policy(),
        max_sessions = config.sessions.max_sessions,
        idle_timeout_secs = config.sessions.idle_timeout.as_secs(),
        "listing loader configured"
    );

    if args.preload {
        let report = listings
            .sessions
            .session(DEFAULT_SESSION)
            .reload(&listings.loader)
            .await?;
        info!(
            elapsed_ms = report.elapsed_ms,
            complete = report.is_complete(),
            "default session preloaded"
        );
    }

    let app = with_listing_routes(listings)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "realty insights service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
