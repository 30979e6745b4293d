//! Order service: checkout, queries and lifecycle changes

mod service;

use serde::Deserialize;
use shared::models::ShippingAddress;
use shared::order::{OrderStatus, PaymentMethod};
use validator::Validate;

pub use service::{CreateOutcome, OrderService};

/// Checkout from the cart
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    /// Cart entries to buy; empty means the whole cart
    #[serde(default)]
    pub item_ids: Vec<i64>,
    #[validate(nested)]
    pub shipping: ShippingAddress,
    pub payment_method: PaymentMethod,
    #[serde(default, alias = "impUid")]
    pub transaction_id: Option<String>,
    #[serde(default, alias = "merchantUid")]
    pub merchant_order_id: Option<String>,
}

/// Single-product checkout that bypasses the cart
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BuyNowRequest {
    pub product_id: i64,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    #[serde(default)]
    pub selected_color: String,
    #[serde(default)]
    pub selected_size: String,
    #[validate(nested)]
    pub shipping: ShippingAddress,
    pub payment_method: PaymentMethod,
    #[serde(default, alias = "impUid")]
    pub transaction_id: Option<String>,
    #[serde(default, alias = "merchantUid")]
    pub merchant_order_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    #[serde(default, alias = "reason")]
    pub cancel_reason: Option<String>,
}

/// Admin status change
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub status: OrderStatus,
    #[serde(default)]
    pub shipping_company: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub cancel_reason: Option<String>,
    #[serde(default)]
    pub refund_amount: Option<i64>,
}

/// Admin correction of carrier / tracking number
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingInfoRequest {
    #[serde(default)]
    pub shipping_company: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
}

pub const DEFAULT_PAGE_LIMIT: i64 = 10;
pub const DEFAULT_ADMIN_PAGE_LIMIT: i64 = 20;
pub const MAX_PAGE_LIMIT: i64 = 100;

/// 1-based page with a bounded size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Page {
    pub fn new(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> Self {
        Self {
            page: page.filter(|p| *p >= 1).unwrap_or(1),
            limit: limit
                .filter(|l| *l >= 1)
                .unwrap_or(default_limit)
                .min(MAX_PAGE_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Order list query
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub status: Option<OrderStatus>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}
