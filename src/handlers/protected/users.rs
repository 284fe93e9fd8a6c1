// handlers/protected/users.rs - /api/v1/users handlers

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::Page;
use crate::hierarchy::RequestContext;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::User;
use crate::services::{CreateUser, UpdateUser};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/v1/users - users inside the caller's scope, ordered by username
pub async fn user_list(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<User>> {
    let page = Page::new(query.limit, query.offset);
    let users = state.hierarchy.list_users(&ctx, &auth.scope, page).await?;
    Ok(ApiResponse::success(users))
}

/**
 * POST /api/v1/users - Create a user
 *
 * Placement comes from `department_id` (preferred) or `branch_id`; shop and
 * region are always recomputed. With neither the request fails with
 * `placement_required`.
 */
pub async fn user_create(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(auth): Extension<AuthUser>,
    Json(input): Json<CreateUser>,
) -> ApiResult<User> {
    let user = state.hierarchy.create_user(&ctx, &auth.scope, input).await?;
    Ok(ApiResponse::created(user))
}

pub async fn user_get(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<User> {
    let user = state.hierarchy.get_user(&ctx, &auth.scope, id).await?;
    Ok(ApiResponse::success(user))
}

/// PUT /api/v1/users/:id - `branch_id` alone moves the user and clears the department
pub async fn user_update(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateUser>,
) -> ApiResult<User> {
    let user = state.hierarchy.update_user(&ctx, &auth.scope, id, input).await?;
    Ok(ApiResponse::success(user))
}

pub async fn user_delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.hierarchy.delete_user(&ctx, &auth.scope, id).await?;
    Ok(ApiResponse::no_content())
}
