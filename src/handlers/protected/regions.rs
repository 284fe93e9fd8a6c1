// handlers/protected/regions.rs - /api/v1/regions handlers

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::hierarchy::RequestContext;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::Region;
use crate::services::{CreateRegion, Rename};

/// POST /api/v1/regions - `{"shop_id": "...", "name": "..."}`
pub async fn region_create(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(auth): Extension<AuthUser>,
    Json(input): Json<CreateRegion>,
) -> ApiResult<Region> {
    let region = state.hierarchy.create_region(&ctx, &auth.scope, input).await?;
    Ok(ApiResponse::created(region))
}

pub async fn region_get(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Region> {
    let region = state.hierarchy.get_region(&ctx, &auth.scope, id).await?;
    Ok(ApiResponse::success(region))
}

pub async fn region_update(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<Rename>,
) -> ApiResult<Region> {
    let region = state.hierarchy.rename_region(&ctx, &auth.scope, id, input).await?;
    Ok(ApiResponse::success(region))
}

pub async fn region_delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.hierarchy.delete_region(&ctx, &auth.scope, id).await?;
    Ok(ApiResponse::no_content())
}
