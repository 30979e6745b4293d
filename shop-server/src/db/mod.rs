//! Persistence
//!
//! [`Store`] is the seam between services and storage. [`PgStore`] backs the
//! running server; [`MemoryStore`] keeps the same atomicity guarantees in
//! process and is used by tests and local demos.

pub mod memory;
pub mod pg;

use async_trait::async_trait;
use shared::models::{CartItem, Order, Product, StatusCounts};
use shared::order::OrderStatus;
use thiserror::Error;

pub use memory::MemoryStore;
pub use pg::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Conditional stock decrement matched no row
    #[error("insufficient stock for product {product_id} ({name})")]
    InsufficientStock { product_id: i64, name: String },
    /// Order status changed since it was read
    #[error("order {0} was modified concurrently")]
    StaleOrder(i64),
    #[error("order number {0} is already taken")]
    DuplicateOrderNumber(String),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// New cart entry; merged into an existing entry with the same options
#[derive(Debug, Clone)]
pub struct NewCartItem {
    pub product_id: i64,
    pub quantity: i32,
    pub selected_color: String,
    pub selected_size: String,
    pub price: i64,
}

/// Order list query
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    /// Restrict to one customer's orders
    pub owner: Option<String>,
    pub status: Option<OrderStatus>,
    /// Case-insensitive match on order number, recipient name or phone
    pub search: Option<String>,
    pub offset: i64,
    pub limit: i64,
}

#[derive(Debug, Clone)]
pub enum CommitOutcome {
    Created(Order),
    /// Another order already carries the merchant transaction id
    Duplicate(Order),
}

#[async_trait]
pub trait Store: Send + Sync {
    // ========== Products ==========

    async fn find_products(&self, ids: &[i64]) -> StoreResult<Vec<Product>>;

    // ========== Cart ==========

    async fn load_cart(&self, user_id: &str) -> StoreResult<Vec<CartItem>>;

    /// Insert or merge an entry (quantities summed, original price kept)
    async fn add_cart_item(&self, user_id: &str, item: NewCartItem) -> StoreResult<CartItem>;

    /// Returns `false` when the entry does not exist
    async fn set_cart_item_quantity(
        &self,
        user_id: &str,
        item_id: i64,
        quantity: i32,
    ) -> StoreResult<bool>;

    /// Returns the number of entries removed
    async fn remove_cart_items(&self, user_id: &str, item_ids: &[i64]) -> StoreResult<u64>;

    async fn clear_cart(&self, user_id: &str) -> StoreResult<()>;

    // ========== Orders ==========

    async fn find_order(&self, id: i64, owner: Option<&str>) -> StoreResult<Option<Order>>;

    async fn find_order_by_merchant_uid(&self, merchant_uid: &str) -> StoreResult<Option<Order>>;

    /// Newest first, plus the total count matching the filter
    async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<(Vec<Order>, i64)>;

    async fn count_by_status(&self, owner: &str) -> StoreResult<StatusCounts>;

    /// Persist a new order in one transaction:
    /// 1. assign the order number (merchant uid, else the next daily sequence)
    /// 2. decrement stock per product, failing if any product is short
    /// 3. insert the order, yielding to an existing order with the same merchant uid
    /// 4. delete the consumed cart entries
    async fn commit_order(
        &self,
        order: Order,
        consumed_cart_items: &[i64],
    ) -> StoreResult<CommitOutcome>;

    /// Save an updated order if its status is still `expected`, giving line
    /// item quantities back to stock in the same transaction when asked.
    async fn update_order(
        &self,
        order: &Order,
        expected: OrderStatus,
        restore_stock: bool,
    ) -> StoreResult<()>;
}

/// Quantities per product, ascending by product id
pub(crate) fn quantities_by_product(order: &Order) -> Vec<(i64, i32, &str)> {
    let mut totals: Vec<(i64, i32, &str)> = Vec::new();
    for item in &order.items {
        match totals.iter_mut().find(|(id, _, _)| *id == item.product_id) {
            Some(entry) => entry.1 += item.quantity,
            None => totals.push((item.product_id, item.quantity, item.name.as_str())),
        }
    }
    totals.sort_by_key(|(id, _, _)| *id);
    totals
}
