// handlers/protected/branches.rs - /api/v1/branches handlers

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::hierarchy::RequestContext;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::Branch;
use crate::services::{CreateBranch, Rename};

/// POST /api/v1/branches - `{"region_id": "...", "name": "..."}`
pub async fn branch_create(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(auth): Extension<AuthUser>,
    Json(input): Json<CreateBranch>,
) -> ApiResult<Branch> {
    let branch = state.hierarchy.create_branch(&ctx, &auth.scope, input).await?;
    Ok(ApiResponse::created(branch))
}

pub async fn branch_get(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Branch> {
    let branch = state.hierarchy.get_branch(&ctx, &auth.scope, id).await?;
    Ok(ApiResponse::success(branch))
}

pub async fn branch_update(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<Rename>,
) -> ApiResult<Branch> {
    let branch = state.hierarchy.rename_branch(&ctx, &auth.scope, id, input).await?;
    Ok(ApiResponse::success(branch))
}

/// DELETE /api/v1/branches/:id - 409 branch_in_use while departments or users remain
pub async fn branch_delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.hierarchy.delete_branch(&ctx, &auth.scope, id).await?;
    Ok(ApiResponse::no_content())
}
