// handlers/protected/me.rs - GET /api/v1/me

use axum::Extension;
use serde::Serialize;
use uuid::Uuid;

use crate::hierarchy::Scope;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

#[derive(Debug, Serialize)]
pub struct Me {
    pub user_id: Uuid,
    pub username: String,
    pub scope: Scope,
}

/// The caller's identity and the scope derived from its token.
pub async fn me_get(Extension(auth): Extension<AuthUser>) -> ApiResult<Me> {
    Ok(ApiResponse::success(Me {
        user_id: auth.user_id,
        username: auth.username,
        scope: auth.scope,
    }))
}
