use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use axum::{middleware as axum_middleware, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rub_exchange_engine::auth::rate_limit::{RateLimitConfig, RateLimiterState};
use rub_exchange_engine::config::AppConfig;
use rub_exchange_engine::db::Database;
use rub_exchange_engine::{api, metrics, AppState};

async fn health_check() -> &'static str {
    "ok"
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rub_exchange_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;

    tracing::info!("connecting to database");
    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;

    let prometheus_handle = metrics::init_metrics();

    let rate_limiter = RateLimiterState::new(RateLimitConfig {
        max_requests: config.rate_limit_per_minute,
        window_secs: 60,
    });

    let state = Arc::new(AppState { config: config.clone(), db });

    let metrics_router = Router::new().route(
        "/metrics",
        get(move || {
            let handle = prometheus_handle.clone();
            async move { handle.render() }
        }),
    );

    let app = Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api::routes::create_router(state.clone()))
        .merge(metrics_router)
        .layer(axum_middleware::from_fn(api::middleware::metrics_middleware))
        .layer(axum_middleware::from_fn_with_state(
            rate_limiter,
            rub_exchange_engine::auth::rate_limit::rate_limit_by_header,
        ))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from_str(&config.bind_addr())?;
    tracing::info!(%addr, "starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
