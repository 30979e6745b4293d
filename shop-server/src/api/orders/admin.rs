//! Admin order handlers

use axum::{
    Extension,
    extract::{Path, Query, State},
};
use shared::error::{ApiResponse, AppResult, ErrorCode};
use shared::models::{Order, OrderListPage};

use crate::api::extract::{AppJson, ListParams, parse_id};
use crate::auth::CurrentUser;
use crate::orders::{ShippingInfoRequest, StatusUpdateRequest};
use crate::state::AppState;

/// GET /api/orders/admin/all - all orders, with search
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<ApiResponse<OrderListPage>> {
    let query = params.into_query()?;
    let page = state.orders.admin_list(query).await?;
    Ok(ApiResponse::success(page))
}

/// GET /api/orders/admin/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Order>> {
    let id = parse_id(&id, ErrorCode::OrderNotFound)?;
    let order = state.orders.admin_get(id).await?;
    Ok(ApiResponse::success(order))
}

/// PATCH /api/orders/admin/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    Path(id): Path<String>,
    AppJson(req): AppJson<StatusUpdateRequest>,
) -> AppResult<ApiResponse<Order>> {
    let id = parse_id(&id, ErrorCode::OrderNotFound)?;
    let order = state.orders.admin_transition(&admin.id, id, req).await?;
    Ok(ApiResponse::success_with_message("Order status updated", order))
}

/// PATCH /api/orders/admin/{id}/shipping - carrier / tracking correction
pub async fn update_shipping(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    Path(id): Path<String>,
    AppJson(req): AppJson<ShippingInfoRequest>,
) -> AppResult<ApiResponse<Order>> {
    let id = parse_id(&id, ErrorCode::OrderNotFound)?;
    let order = state
        .orders
        .update_shipping_info(&admin.id, id, req)
        .await?;
    Ok(ApiResponse::success_with_message("Shipping info updated", order))
}
