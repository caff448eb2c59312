//! HTTP handlers for article families

use axum::{extract::State, Json};

use shared::Family;

use super::ApiResponse;
use crate::middleware::CurrentUser;
use crate::AppState;

/// Families of listable articles
pub async fn list_families(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> Json<ApiResponse<Vec<Family>>> {
    Json(ApiResponse::ok(state.stock.list_families().await))
}
