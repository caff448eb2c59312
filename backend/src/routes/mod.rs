//! Route definitions for the stock lookup API

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Auth routes (public login)
        .nest("/auth", auth_routes(state.clone()))
        // Protected routes - stock lookup
        .nest("/depots", warehouse_routes(state.clone()))
        .nest("/articles", article_routes(state.clone()))
        .nest("/familles", family_routes(state.clone()))
        // Protected routes - operator actions
        .nest("/admin", admin_routes(state))
}

/// Authentication routes
fn auth_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/me", get(handlers::me))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/login", post(handlers::login))
        .merge(protected)
}

/// Warehouse routes (protected)
fn warehouse_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_warehouses))
        .route("/:code/stock", get(handlers::warehouse_stock))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Article routes (protected)
fn article_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_articles))
        .route("/:reference", get(handlers::article_detail))
        .route("/:reference/stock", get(handlers::article_stock))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Family routes (protected)
fn family_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_families))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Operator routes (admin only)
fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/cache", get(handlers::cache_stats))
        .route("/cache/clear", post(handlers::clear_cache))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
