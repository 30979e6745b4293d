//! Customer order handlers

use axum::{
    Extension,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
};
use shared::error::{ApiResponse, AppError, AppResult, ErrorCode};
use shared::models::{Order, OrderListPage};

use crate::api::extract::{ListParams, ValidJson, parse_id};
use crate::auth::CurrentUser;
use crate::orders::{BuyNowRequest, CancelRequest, CreateOrderRequest, CreateOutcome};
use crate::state::AppState;

/// 201 for a new order, 200 when an earlier order is returned
fn created(outcome: CreateOutcome) -> (StatusCode, ApiResponse<Order>) {
    if outcome.created {
        (
            StatusCode::CREATED,
            ApiResponse::success_with_message("Order created", outcome.order),
        )
    } else {
        (
            StatusCode::OK,
            ApiResponse::success_with_message("Order already exists", outcome.order),
        )
    }
}

/// POST /api/orders - create from cart
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ValidJson(req): ValidJson<CreateOrderRequest>,
) -> AppResult<(StatusCode, ApiResponse<Order>)> {
    let outcome = state.orders.create_from_cart(&user.id, req).await?;
    Ok(created(outcome))
}

/// POST /api/orders/buy-now
pub async fn buy_now(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ValidJson(req): ValidJson<BuyNowRequest>,
) -> AppResult<(StatusCode, ApiResponse<Order>)> {
    let outcome = state.orders.buy_now(&user.id, req).await?;
    Ok(created(outcome))
}

/// GET /api/orders - own orders with status counts
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<ListParams>,
) -> AppResult<ApiResponse<OrderListPage>> {
    let query = params.into_query()?;
    let page = state.orders.list_own(&user.id, query).await?;
    Ok(ApiResponse::success(page))
}

/// GET /api/orders/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Order>> {
    let id = parse_id(&id, ErrorCode::OrderNotFound)?;
    let order = state.orders.get_own(&user.id, id).await?;
    Ok(ApiResponse::success(order))
}

/// PATCH /api/orders/{id}/cancel - body is optional
pub async fn cancel(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<ApiResponse<Order>> {
    let id = parse_id(&id, ErrorCode::OrderNotFound)?;
    let req: CancelRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CancelRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::validation(e.to_string()))?
    };

    let order = state.orders.cancel_own(&user.id, id, req.cancel_reason).await?;
    Ok(ApiResponse::success_with_message("Order cancelled", order))
}
