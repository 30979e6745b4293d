//! In-process store
//!
//! Every operation runs under a single lock, which gives each multi-step
//! operation the same all-or-nothing behavior as a database transaction.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::Mutex;
use shared::models::{CartItem, Order, Product, StatusCounts};
use shared::order::{OrderStatus, day_key, format_order_number};
use shared::util::snowflake_id;

use super::{
    CommitOutcome, NewCartItem, OrderFilter, Store, StoreError, StoreResult, quantities_by_product,
};

#[derive(Default)]
struct Inner {
    products: BTreeMap<i64, Product>,
    carts: HashMap<String, Vec<CartItem>>,
    orders: BTreeMap<i64, Order>,
    sequences: HashMap<String, i64>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_product(&self, product: Product) {
        self.inner.lock().products.insert(product.id, product);
    }

    pub fn product(&self, id: i64) -> Option<Product> {
        self.inner.lock().products.get(&id).cloned()
    }

    pub fn stock_of(&self, id: i64) -> Option<i32> {
        self.inner.lock().products.get(&id).map(|p| p.stock)
    }

    pub fn order_count(&self) -> usize {
        self.inner.lock().orders.len()
    }
}

fn matches_search(order: &Order, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    [
        &order.order_number,
        &order.shipping.recipient_name,
        &order.shipping.recipient_phone,
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(&needle))
}

fn restore_stock(products: &mut BTreeMap<i64, Product>, order: &Order) {
    for (product_id, quantity, _) in quantities_by_product(order) {
        if let Some(product) = products.get_mut(&product_id) {
            let stock = product.stock + quantity;
            product.set_stock(stock);
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_products(&self, ids: &[i64]) -> StoreResult<Vec<Product>> {
        let inner = self.inner.lock();
        Ok(ids
            .iter()
            .filter_map(|id| inner.products.get(id).cloned())
            .collect())
    }

    async fn load_cart(&self, user_id: &str) -> StoreResult<Vec<CartItem>> {
        let mut inner = self.inner.lock();
        Ok(inner.carts.entry(user_id.to_string()).or_default().clone())
    }

    async fn add_cart_item(&self, user_id: &str, item: NewCartItem) -> StoreResult<CartItem> {
        let mut inner = self.inner.lock();
        let cart = inner.carts.entry(user_id.to_string()).or_default();

        if let Some(existing) = cart
            .iter_mut()
            .find(|e| e.same_line(item.product_id, &item.selected_color, &item.selected_size))
        {
            existing.quantity += item.quantity;
            return Ok(existing.clone());
        }

        let entry = CartItem {
            id: snowflake_id(),
            product_id: item.product_id,
            quantity: item.quantity,
            selected_color: item.selected_color,
            selected_size: item.selected_size,
            price: item.price,
        };
        cart.push(entry.clone());
        Ok(entry)
    }

    async fn set_cart_item_quantity(
        &self,
        user_id: &str,
        item_id: i64,
        quantity: i32,
    ) -> StoreResult<bool> {
        let mut inner = self.inner.lock();
        let Some(cart) = inner.carts.get_mut(user_id) else {
            return Ok(false);
        };
        let Some(pos) = cart.iter().position(|e| e.id == item_id) else {
            return Ok(false);
        };

        if quantity <= 0 {
            cart.remove(pos);
        } else {
            cart[pos].quantity = quantity;
        }
        Ok(true)
    }

    async fn remove_cart_items(&self, user_id: &str, item_ids: &[i64]) -> StoreResult<u64> {
        let mut inner = self.inner.lock();
        let Some(cart) = inner.carts.get_mut(user_id) else {
            return Ok(0);
        };
        let before = cart.len();
        cart.retain(|e| !item_ids.contains(&e.id));
        Ok((before - cart.len()) as u64)
    }

    async fn clear_cart(&self, user_id: &str) -> StoreResult<()> {
        self.inner.lock().carts.insert(user_id.to_string(), Vec::new());
        Ok(())
    }

    async fn find_order(&self, id: i64, owner: Option<&str>) -> StoreResult<Option<Order>> {
        let inner = self.inner.lock();
        Ok(inner
            .orders
            .get(&id)
            .filter(|o| owner.is_none_or(|owner| o.user_id == owner))
            .cloned())
    }

    async fn find_order_by_merchant_uid(&self, merchant_uid: &str) -> StoreResult<Option<Order>> {
        if merchant_uid.is_empty() {
            return Ok(None);
        }
        let inner = self.inner.lock();
        Ok(inner
            .orders
            .values()
            .find(|o| o.merchant_uid == merchant_uid)
            .cloned())
    }

    async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<(Vec<Order>, i64)> {
        let inner = self.inner.lock();
        let mut matching: Vec<&Order> = inner
            .orders
            .values()
            .filter(|o| filter.owner.as_deref().is_none_or(|owner| o.user_id == owner))
            .filter(|o| filter.status.is_none_or(|s| o.status == s))
            .filter(|o| {
                filter
                    .search
                    .as_deref()
                    .is_none_or(|needle| matches_search(o, needle))
            })
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn count_by_status(&self, owner: &str) -> StoreResult<StatusCounts> {
        let inner = self.inner.lock();
        let mut counts = StatusCounts::default();
        for order in inner.orders.values().filter(|o| o.user_id == owner) {
            counts.all += 1;
            match order.status {
                OrderStatus::Preparing => counts.preparing += 1,
                OrderStatus::Shipped => counts.shipped += 1,
                OrderStatus::Delivered => counts.delivered += 1,
                _ => {}
            }
        }
        Ok(counts)
    }

    async fn commit_order(
        &self,
        mut order: Order,
        consumed_cart_items: &[i64],
    ) -> StoreResult<CommitOutcome> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if !order.merchant_uid.is_empty()
            && let Some(existing) = inner
                .orders
                .values()
                .find(|o| o.merchant_uid == order.merchant_uid)
        {
            return Ok(CommitOutcome::Duplicate(existing.clone()));
        }

        let day = day_key(order.created_at);
        let next_seq = inner.sequences.get(&day).copied().unwrap_or(0) + 1;
        order.order_number = if order.merchant_uid.is_empty() {
            format_order_number(&day, next_seq)
        } else {
            order.merchant_uid.clone()
        };
        if inner
            .orders
            .values()
            .any(|o| o.order_number == order.order_number)
        {
            return Err(StoreError::DuplicateOrderNumber(order.order_number));
        }

        // Check every product first so a failure leaves nothing half-applied
        let quantities = quantities_by_product(&order);
        for (product_id, quantity, name) in &quantities {
            let available = inner.products.get(product_id).map_or(0, |p| p.stock);
            if available < *quantity {
                return Err(StoreError::InsufficientStock {
                    product_id: *product_id,
                    name: name.to_string(),
                });
            }
        }
        for (product_id, quantity, _) in &quantities {
            if let Some(product) = inner.products.get_mut(product_id) {
                let stock = product.stock - quantity;
                product.set_stock(stock);
            }
        }

        if order.merchant_uid.is_empty() {
            inner.sequences.insert(day, next_seq);
        }

        if let Some(cart) = inner.carts.get_mut(&order.user_id) {
            cart.retain(|e| !consumed_cart_items.contains(&e.id));
        }

        inner.orders.insert(order.id, order.clone());
        Ok(CommitOutcome::Created(order))
    }

    async fn update_order(
        &self,
        order: &Order,
        expected: OrderStatus,
        restore: bool,
    ) -> StoreResult<()> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        match inner.orders.get(&order.id) {
            Some(current) if current.status == expected => {}
            _ => return Err(StoreError::StaleOrder(order.id)),
        }

        if restore {
            restore_stock(&mut inner.products, order);
        }
        inner.orders.insert(order.id, order.clone());
        Ok(())
    }
}
