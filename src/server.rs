use crate::cli::ServeArgs;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::infra::{build_engine, parse_seed_listing, AppState};
use crate::routes::with_reservation_routes;
use crate::telemetry;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

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

    let engine = build_engine(&config.booking);
    for seed in &args.seed_listing {
        let profile = parse_seed_listing(seed).map_err(AppError::Cli)?;
        info!(listing = %profile.id, base_cents = profile.base_price_cents, "seeded listing");
        engine.catalog.insert(profile);
    }

    spawn_hold_sweeper(&engine, config.booking.sweep_interval_secs);

    let app = with_reservation_routes(engine.api)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "reservation engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Periodically reverts expired holds so stored rows do not accumulate.
/// Lazy expiry keeps the calendar correct even when this loop falls behind.
fn spawn_hold_sweeper(engine: &crate::infra::Engine, interval_secs: u64) {
    if interval_secs == 0 {
        return;
    }
    let holds = engine.api.holds.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            if let Err(err) = holds.sweep_expired() {
                warn!(error = %err, "expired hold sweep failed");
            }
        }
    });
}
