use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
    Router,
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use wms_api::channels::{shopify::ShopifyDriver, DriverRegistry};
use wms_api::config::AppConfig;
use wms_api::events::{event_channel, process_events};
use wms_api::handlers::api_router;
use wms_api::{db, AppState};

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not Found" })))
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.environment == "production" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Arc::new(AppConfig::load().context("loading configuration")?);
    init_tracing(&config);
    info!(environment = %config.environment, "starting wms-api");

    let db = Arc::new(db::connect(&config).await.context("connecting to database")?);
    db::run_migrations(&db).await.context("running migrations")?;

    let mut registry = DriverRegistry::new();
    registry.register(Arc::new(ShopifyDriver::new(Duration::from_secs(
        config.channel_sync.push_timeout_secs,
    ))?));
    let registry = Arc::new(registry);

    let (event_sender, event_rx) = event_channel();
    let state = AppState::build(config.clone(), db, event_sender, registry);

    // Reactive channel sync hangs off the event loop, after commits.
    tokio::spawn(process_events(event_rx, Some(state.channel_sync.clone())));

    // Interval auto-release sweeps allocated orders into the pick queue.
    if let Some(period) = config.auto_release.period_secs() {
        let orders = state.orders.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(period));
            loop {
                ticker.tick().await;
                match orders.release_pending().await {
                    Ok(0) => {}
                    Ok(n) => info!(released = n, "auto-release sweep"),
                    Err(e) => error!("auto-release sweep failed: {e}"),
                }
            }
        });
    }

    let app = Router::new()
        .nest("/api", api_router())
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state);

    let addr = config.listen_addr();
    info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app).await.context("serving")?;
    Ok(())
}
