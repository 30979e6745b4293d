//! Order Model

use crate::order::{OrderStatus, PaymentMethod, PaymentStatus};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Frozen snapshot of one purchased line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: i64,
    pub name: String,
    pub image: String,
    /// Unit price at purchase time
    pub price: i64,
    pub quantity: i32,
    #[serde(default)]
    pub selected_color: String,
    #[serde(default)]
    pub selected_size: String,
}

impl OrderItem {
    pub fn line_total(&self) -> i64 {
        self.price * i64::from(self.quantity)
    }
}

/// Delivery destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[validate(length(min = 1, message = "Recipient name is required"))]
    pub recipient_name: String,
    #[validate(length(min = 1, message = "Recipient phone is required"))]
    pub recipient_phone: String,
    #[validate(length(min = 1, message = "Postal code is required"))]
    pub postal_code: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    #[serde(default)]
    pub address_detail: String,
    #[serde(default)]
    pub delivery_memo: String,
}

/// Payment sub-record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub paid_at: Option<i64>,
    /// `false` when the order was accepted without gateway confirmation
    pub verified: bool,
}

/// Order entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub user_id: String,
    /// Gateway transaction id
    #[serde(default)]
    pub imp_uid: String,
    /// Merchant transaction id, unique when non-empty
    #[serde(default)]
    pub merchant_uid: String,
    pub items: Vec<OrderItem>,
    pub shipping: ShippingAddress,
    pub payment: PaymentInfo,
    pub total_product_amount: i64,
    pub shipping_fee: i64,
    pub discount_amount: i64,
    pub total_amount: i64,
    pub total_quantity: i32,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipped_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<i64>,
    pub refund_amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refunded_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Per-status order counts shown next to the customer's order list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub all: i64,
    pub preparing: i64,
    pub shipped: i64,
    pub delivered: i64,
}

/// One page of orders
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListPage {
    pub orders: Vec<Order>,
    /// Orders on this page
    pub count: usize,
    pub total_count: i64,
    pub total_pages: i64,
    pub current_page: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_counts: Option<StatusCounts>,
}

impl OrderListPage {
    pub fn new(orders: Vec<Order>, total_count: i64, page: i64, limit: i64) -> Self {
        let total_pages = if limit > 0 {
            (total_count + limit - 1) / limit
        } else {
            0
        };
        Self {
            count: orders.len(),
            orders,
            total_count,
            total_pages,
            current_page: page,
            status_counts: None,
        }
    }

    pub fn with_status_counts(mut self, counts: StatusCounts) -> Self {
        self.status_counts = Some(counts);
        self
    }
}
