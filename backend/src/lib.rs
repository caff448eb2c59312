//! KLY stock lookup server
//!
//! Read-only HTTP API over the Sage 100 warehouse, article and family tables,
//! with an exclusion policy, stock-level classification and a result cache.

use std::{sync::Arc, time::Duration};

use axum::{
    http::{header, HeaderValue},
    routing::get,
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

pub mod cache;
pub mod config;
pub mod erp;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;

pub use config::Config;

use cache::{CacheSettings, ResultCache};
use erp::StockSource;
use services::{AuthService, StockService};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub stock: StockService,
    pub auth: AuthService,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, source: Arc<dyn StockSource>) -> Self {
        let cache = ResultCache::new(CacheSettings::from(&config.cache));
        Self {
            stock: StockService::new(source, cache),
            auth: AuthService::new(&config),
            config: Arc::new(config),
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api", routes::api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::HeaderName::from_static("permissions-policy"),
            HeaderValue::from_static("camera=(), microphone=(), geolocation=()"),
        ))
        .with_state(state)
}

/// Periodically drop expired cache entries and stale login-throttle records
pub fn spawn_maintenance(state: &AppState) -> tokio::task::JoinHandle<()> {
    let period = Duration::from_secs(state.config.cache.sweep_interval_secs.max(1));
    let stock = state.stock.clone();
    let auth = state.auth.clone();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let expired = stock.cache().purge_expired();
            let released = auth.throttle().sweep();
            if expired > 0 || released > 0 {
                tracing::debug!(expired, released, "Maintenance sweep");
            }
        }
    })
}
