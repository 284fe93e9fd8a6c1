// handlers/public/auth.rs - POST /api/v1/auth/{register,login}

use axum::{extract::State, Extension, Json};

use crate::app::AppState;
use crate::hierarchy::RequestContext;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{AuthResponse, LoginRequest, RegisterRequest};

/**
 * POST /api/v1/auth/register - Create a user in an existing shop
 *
 * ```json
 * {
 *   "username": "ana",
 *   "password": "at least 8 chars",
 *   "email": "ana@example.com",
 *   "role": "branch_manager",
 *   "shop_id": "uuid",
 *   "branch_id": "uuid",       // or department_id; department wins
 *   "department_id": "uuid"
 * }
 * ```
 *
 * Returns the created user and an access token.
 */
pub async fn register(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(input): Json<RegisterRequest>,
) -> ApiResult<AuthResponse> {
    let response = state.auth.register(&ctx, input).await?;
    Ok(ApiResponse::created(response))
}

/// POST /api/v1/auth/login - Exchange username and password for a token
pub async fn login(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(input): Json<LoginRequest>,
) -> ApiResult<AuthResponse> {
    let response = state.auth.login(&ctx, input).await?;
    Ok(ApiResponse::success(response))
}
