//! Cart handlers

use axum::{
    Extension,
    extract::{Path, State},
};
use shared::error::{ApiResponse, AppResult, ErrorCode};
use shared::models::Cart;

use crate::api::extract::{AppJson, ValidJson, parse_id};
use crate::auth::CurrentUser;
use crate::cart::{AddCartItemRequest, RemoveItemsRequest, UpdateQuantityRequest};
use crate::state::AppState;

/// GET /api/cart
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<ApiResponse<Cart>> {
    Ok(ApiResponse::success(state.carts.get(&user.id).await?))
}

/// POST /api/cart/items
pub async fn add_item(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ValidJson(req): ValidJson<AddCartItemRequest>,
) -> AppResult<ApiResponse<Cart>> {
    let cart = state.carts.add_item(&user.id, req).await?;
    Ok(ApiResponse::success_with_message("Item added to cart", cart))
}

/// PATCH /api/cart/items/{item_id}
pub async fn update_quantity(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(item_id): Path<String>,
    AppJson(req): AppJson<UpdateQuantityRequest>,
) -> AppResult<ApiResponse<Cart>> {
    let item_id = parse_id(&item_id, ErrorCode::CartItemNotFound)?;
    let cart = state
        .carts
        .update_quantity(&user.id, item_id, req.quantity)
        .await?;
    Ok(ApiResponse::success(cart))
}

/// DELETE /api/cart/items/{item_id}
pub async fn remove_item(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(item_id): Path<String>,
) -> AppResult<ApiResponse<Cart>> {
    let item_id = parse_id(&item_id, ErrorCode::CartItemNotFound)?;
    let cart = state.carts.remove_item(&user.id, item_id).await?;
    Ok(ApiResponse::success_with_message("Item removed", cart))
}

/// DELETE /api/cart/items - body `{ "itemIds": [...] }`
pub async fn remove_selected(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    AppJson(req): AppJson<RemoveItemsRequest>,
) -> AppResult<ApiResponse<Cart>> {
    let cart = state.carts.remove_selected(&user.id, &req.item_ids).await?;
    Ok(ApiResponse::success_with_message("Items removed", cart))
}

/// DELETE /api/cart
pub async fn clear(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<ApiResponse<Cart>> {
    let cart = state.carts.clear(&user.id).await?;
    Ok(ApiResponse::success_with_message("Cart cleared", cart))
}
