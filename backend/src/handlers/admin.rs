//! Operator actions on the result cache

use axum::{extract::State, Json};
use serde::Serialize;

use super::ApiResponse;
use crate::cache::CacheStats;
use crate::middleware::AdminUser;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ClearedResponse {
    pub cleared: usize,
}

pub async fn cache_stats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Json<ApiResponse<CacheStats>> {
    Json(ApiResponse::ok(state.stock.cache_stats()))
}

/// Drop every cached result so the next reads go to the ERP
pub async fn clear_cache(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Json<ApiResponse<ClearedResponse>> {
    let cleared = state.stock.cache().clear();
    tracing::info!(by = %admin.email, cleared, "Cache cleared by operator");
    Json(ApiResponse::ok(ClearedResponse { cleared }))
}
