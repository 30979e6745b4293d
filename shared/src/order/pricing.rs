//! Order amount calculation

use crate::models::OrderItem;

/// Subtotal from which shipping is free
pub const FREE_SHIPPING_THRESHOLD: i64 = 30_000;
/// Flat shipping fee below the threshold
pub const FLAT_SHIPPING_FEE: i64 = 3_000;

/// Monetary breakdown of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderAmounts {
    pub total_product_amount: i64,
    pub shipping_fee: i64,
    pub discount_amount: i64,
    pub total_amount: i64,
    pub total_quantity: i32,
}

impl OrderAmounts {
    /// `total = subtotal + shipping - discount`; discount is clamped so the
    /// total never goes negative.
    pub fn compute(items: &[OrderItem], discount: i64) -> Self {
        let total_product_amount: i64 = items.iter().map(OrderItem::line_total).sum();
        let total_quantity: i32 = items.iter().map(|i| i.quantity).sum();
        let shipping_fee = shipping_fee_for(total_product_amount);
        let discount_amount = discount.clamp(0, total_product_amount + shipping_fee);

        Self {
            total_product_amount,
            shipping_fee,
            discount_amount,
            total_amount: total_product_amount + shipping_fee - discount_amount,
            total_quantity,
        }
    }
}

pub fn shipping_fee_for(subtotal: i64) -> i64 {
    if subtotal >= FREE_SHIPPING_THRESHOLD {
        0
    } else {
        FLAT_SHIPPING_FEE
    }
}
