//! Cart Model

use super::product::ProductSummary;
use serde::{Deserialize, Serialize};

/// Stored cart entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: i64,
    pub product_id: i64,
    pub quantity: i32,
    #[serde(default)]
    pub selected_color: String,
    #[serde(default)]
    pub selected_size: String,
    /// Unit price captured when the entry was added
    pub price: i64,
}

impl CartItem {
    /// Whether this entry holds the same product and options
    pub fn same_line(&self, product_id: i64, color: &str, size: &str) -> bool {
        self.product_id == product_id && self.selected_color == color && self.selected_size == size
    }
}

/// Cart entry populated with the current product summary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    #[serde(flatten)]
    pub item: CartItem,
    /// `None` when the product has been removed from the catalog
    pub product: Option<ProductSummary>,
}

/// Per-user cart
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub user_id: String,
    pub items: Vec<CartItemView>,
    pub total_items: i64,
    pub total_amount: i64,
}

impl Cart {
    pub fn new(user_id: impl Into<String>, items: Vec<CartItemView>) -> Self {
        let total_items = items.iter().map(|v| i64::from(v.item.quantity)).sum();
        let total_amount = items
            .iter()
            .map(|v| v.item.price * i64::from(v.item.quantity))
            .sum();
        Self {
            user_id: user_id.into(),
            items,
            total_items,
            total_amount,
        }
    }
}
