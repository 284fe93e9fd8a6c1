// handlers/protected/shops.rs - /api/v1/shops handlers

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::{NewShop, ShopChanges};
use crate::hierarchy::RequestContext;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::Shop;

/// POST /api/v1/shops - Managers only
pub async fn shop_create(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(auth): Extension<AuthUser>,
    Json(input): Json<NewShop>,
) -> ApiResult<Shop> {
    let shop = state.hierarchy.create_shop(&ctx, &auth.scope, input).await?;
    Ok(ApiResponse::created(shop))
}

/// GET /api/v1/shops/:id
pub async fn shop_get(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Shop> {
    let shop = state.hierarchy.get_shop(&ctx, &auth.scope, id).await?;
    Ok(ApiResponse::success(shop))
}

/// PUT /api/v1/shops/:id - name, code and alias
pub async fn shop_update(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(changes): Json<ShopChanges>,
) -> ApiResult<Shop> {
    let shop = state.hierarchy.update_shop(&ctx, &auth.scope, id, changes).await?;
    Ok(ApiResponse::success(shop))
}

/// DELETE /api/v1/shops/:id - 409 shop_in_use while regions remain
pub async fn shop_delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.hierarchy.delete_shop(&ctx, &auth.scope, id).await?;
    Ok(ApiResponse::no_content())
}
