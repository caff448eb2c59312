//! Authentication handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use validator::Validate;

use super::ApiResponse;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::auth::{LoginInput, LoginResponse, SessionUser};
use crate::AppState;

/// Login endpoint handler
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginInput>, JsonRejection>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let Json(input) = body?;
    input.validate()?;

    let response = state.auth.login(&input).await?;
    Ok(Json(ApiResponse::ok(response)))
}

/// Identity of the current session
pub async fn me(current_user: CurrentUser) -> Json<ApiResponse<SessionUser>> {
    Json(ApiResponse::ok(current_user.0))
}
