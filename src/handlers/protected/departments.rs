// handlers/protected/departments.rs - /api/v1/departments handlers

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::hierarchy::RequestContext;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::Department;
use crate::services::{CreateDepartment, Rename};

/// POST /api/v1/departments - `{"branch_id": "...", "name": "..."}`
pub async fn department_create(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(auth): Extension<AuthUser>,
    Json(input): Json<CreateDepartment>,
) -> ApiResult<Department> {
    let department = state.hierarchy.create_department(&ctx, &auth.scope, input).await?;
    Ok(ApiResponse::created(department))
}

pub async fn department_get(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Department> {
    let department = state.hierarchy.get_department(&ctx, &auth.scope, id).await?;
    Ok(ApiResponse::success(department))
}

pub async fn department_update(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<Rename>,
) -> ApiResult<Department> {
    let department = state.hierarchy.rename_department(&ctx, &auth.scope, id, input).await?;
    Ok(ApiResponse::success(department))
}

pub async fn department_delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.hierarchy.delete_department(&ctx, &auth.scope, id).await?;
    Ok(ApiResponse::no_content())
}
