//! PostgreSQL store

use async_trait::async_trait;
use shared::models::{
    CartItem, Order, OrderItem, PaymentInfo, Product, ProductStatus, ShippingAddress, StatusCounts,
};
use shared::order::{OrderStatus, day_key, format_order_number};
use shared::util::{now_millis, snowflake_id};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};

use super::{
    CommitOutcome, NewCartItem, OrderFilter, Store, StoreError, StoreResult, quantities_by_product,
};

const ORDER_COLUMNS: &str = r#"
    id, order_number, user_id, imp_uid, merchant_uid, items, shipping, payment,
    total_product_amount, shipping_fee, discount_amount, total_amount, total_quantity,
    status, shipping_company, tracking_number, shipped_at, delivered_at,
    cancel_reason, cancelled_at, refund_amount, refunded_at, created_at, updated_at
"#;

/// Moves stock by `$2` and re-derives the status; `discontinued` is kept.
/// Matches no row when the result would go negative.
const ADJUST_STOCK: &str = r#"
    UPDATE products
    SET stock = stock + $2,
        status = CASE
            WHEN status = 'discontinued' THEN status
            WHEN stock + $2 <= 0 THEN 'sold_out'
            WHEN stock + $2 <= 10 THEN 'low_stock'
            ELSE 'on_sale'
        END
    WHERE id = $1 AND stock + $2 >= 0
"#;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and run embedded migrations
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Database(e.into()))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ── Row types ──

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i64,
    sku: String,
    name: String,
    image: String,
    price: i64,
    stock: i32,
    status: String,
    is_active: bool,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let status = ProductStatus::parse(&row.status).ok_or_else(|| {
            StoreError::Corrupt(format!("product {} has status {:?}", row.id, row.status))
        })?;
        Ok(Product {
            id: row.id,
            sku: row.sku,
            name: row.name,
            image: row.image,
            price: row.price,
            stock: row.stock,
            status,
            is_active: row.is_active,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CartItemRow {
    id: i64,
    product_id: i64,
    quantity: i32,
    selected_color: String,
    selected_size: String,
    price: i64,
}

impl From<CartItemRow> for CartItem {
    fn from(row: CartItemRow) -> Self {
        CartItem {
            id: row.id,
            product_id: row.product_id,
            quantity: row.quantity,
            selected_color: row.selected_color,
            selected_size: row.selected_size,
            price: row.price,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    order_number: String,
    user_id: String,
    imp_uid: String,
    merchant_uid: String,
    items: Json<Vec<OrderItem>>,
    shipping: Json<ShippingAddress>,
    payment: Json<PaymentInfo>,
    total_product_amount: i64,
    shipping_fee: i64,
    discount_amount: i64,
    total_amount: i64,
    total_quantity: i32,
    status: String,
    shipping_company: Option<String>,
    tracking_number: Option<String>,
    shipped_at: Option<i64>,
    delivered_at: Option<i64>,
    cancel_reason: Option<String>,
    cancelled_at: Option<i64>,
    refund_amount: i64,
    refunded_at: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status: OrderStatus = row
            .status
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("order {}: {e}", row.id)))?;
        Ok(Order {
            id: row.id,
            order_number: row.order_number,
            user_id: row.user_id,
            imp_uid: row.imp_uid,
            merchant_uid: row.merchant_uid,
            items: row.items.0,
            shipping: row.shipping.0,
            payment: row.payment.0,
            total_product_amount: row.total_product_amount,
            shipping_fee: row.shipping_fee,
            discount_amount: row.discount_amount,
            total_amount: row.total_amount,
            total_quantity: row.total_quantity,
            status,
            shipping_company: row.shipping_company,
            tracking_number: row.tracking_number,
            shipped_at: row.shipped_at,
            delivered_at: row.delivered_at,
            cancel_reason: row.cancel_reason,
            cancelled_at: row.cancelled_at,
            refund_amount: row.refund_amount,
            refunded_at: row.refunded_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_orders(rows: Vec<OrderRow>) -> StoreResult<Vec<Order>> {
    rows.into_iter().map(Order::try_from).collect()
}

/// `%needle%` with LIKE wildcards escaped
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

// ── Transaction steps ──

/// Unique violation on `order_number`; the transaction rolls back with it
fn duplicate_order_number(e: sqlx::Error, order_number: &str) -> StoreError {
    let taken = e.as_database_error().is_some_and(|db| {
        db.is_unique_violation() && db.constraint() == Some("orders_order_number_key")
    });
    if taken {
        StoreError::DuplicateOrderNumber(order_number.to_string())
    } else {
        StoreError::Database(e)
    }
}

async fn next_order_number(
    tx: &mut Transaction<'_, Postgres>,
    created_at: i64,
) -> StoreResult<String> {
    let day = day_key(created_at);
    let (seq,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO order_sequences (day, seq) VALUES ($1, 1)
        ON CONFLICT (day) DO UPDATE SET seq = order_sequences.seq + 1
        RETURNING seq
        "#,
    )
    .bind(&day)
    .fetch_one(&mut **tx)
    .await?;
    Ok(format_order_number(&day, seq))
}

async fn adjust_stock(
    tx: &mut Transaction<'_, Postgres>,
    order: &Order,
    decrement: bool,
) -> StoreResult<()> {
    // Ascending product id keeps lock order consistent across transactions
    for (product_id, quantity, name) in quantities_by_product(order) {
        let delta = if decrement { -quantity } else { quantity };
        let result = sqlx::query(ADJUST_STOCK)
            .bind(product_id)
            .bind(delta)
            .execute(&mut **tx)
            .await?;

        if result.rows_affected() == 0 {
            if decrement {
                return Err(StoreError::InsufficientStock {
                    product_id,
                    name: name.to_string(),
                });
            }
            tracing::warn!(product_id, "Product missing while restoring stock");
        }
    }
    Ok(())
}

#[async_trait]
impl Store for PgStore {
    async fn find_products(&self, ids: &[i64]) -> StoreResult<Vec<Product>> {
        let rows: Vec<ProductRow> = sqlx::query_as(
            "SELECT id, sku, name, image, price, stock, status, is_active FROM products WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Product::try_from).collect()
    }

    async fn load_cart(&self, user_id: &str) -> StoreResult<Vec<CartItem>> {
        let rows: Vec<CartItemRow> = sqlx::query_as(
            r#"
            SELECT id, product_id, quantity, selected_color, selected_size, price
            FROM cart_items WHERE user_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CartItem::from).collect())
    }

    async fn add_cart_item(&self, user_id: &str, item: NewCartItem) -> StoreResult<CartItem> {
        let row: CartItemRow = sqlx::query_as(
            r#"
            INSERT INTO cart_items (
                id, user_id, product_id, quantity, selected_color, selected_size, price, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id, product_id, selected_color, selected_size)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            RETURNING id, product_id, quantity, selected_color, selected_size, price
            "#,
        )
        .bind(snowflake_id())
        .bind(user_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(&item.selected_color)
        .bind(&item.selected_size)
        .bind(item.price)
        .bind(now_millis())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn set_cart_item_quantity(
        &self,
        user_id: &str,
        item_id: i64,
        quantity: i32,
    ) -> StoreResult<bool> {
        let result = if quantity <= 0 {
            sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
                .bind(item_id)
                .bind(user_id)
                .execute(&self.pool)
                .await?
        } else {
            sqlx::query("UPDATE cart_items SET quantity = $3 WHERE id = $1 AND user_id = $2")
                .bind(item_id)
                .bind(user_id)
                .bind(quantity)
                .execute(&self.pool)
                .await?
        };
        Ok(result.rows_affected() > 0)
    }

    async fn remove_cart_items(&self, user_id: &str, item_ids: &[i64]) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND id = ANY($2)")
            .bind(user_id)
            .bind(item_ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn clear_cart(&self, user_id: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_order(&self, id: i64, owner: Option<&str>) -> StoreResult<Option<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND ($2::text IS NULL OR user_id = $2)"
        );
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Order::try_from).transpose()
    }

    async fn find_order_by_merchant_uid(&self, merchant_uid: &str) -> StoreResult<Option<Order>> {
        if merchant_uid.is_empty() {
            return Ok(None);
        }
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE merchant_uid = $1");
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(merchant_uid)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Order::try_from).transpose()
    }

    async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<(Vec<Order>, i64)> {
        const WHERE: &str = r#"
            WHERE ($1::text IS NULL OR user_id = $1)
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL
                   OR order_number ILIKE $3
                   OR shipping->>'recipientName' ILIKE $3
                   OR shipping->>'recipientPhone' ILIKE $3)
        "#;

        let owner = filter.owner.as_deref();
        let status = filter.status.map(|s| s.as_str());
        let search = filter
            .search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(like_pattern);

        let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM orders {WHERE}"))
            .bind(owner)
            .bind(status)
            .bind(search.as_deref())
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders {WHERE} ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5"
        );
        let rows: Vec<OrderRow> = sqlx::query_as(&sql)
            .bind(owner)
            .bind(status)
            .bind(search.as_deref())
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((into_orders(rows)?, total))
    }

    async fn count_by_status(&self, owner: &str) -> StoreResult<StatusCounts> {
        let (all, preparing, shipped, delivered): (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE status = 'preparing'),
                COUNT(*) FILTER (WHERE status = 'shipped'),
                COUNT(*) FILTER (WHERE status = 'delivered')
            FROM orders WHERE user_id = $1
            "#,
        )
        .bind(owner)
        .fetch_one(&self.pool)
        .await?;

        Ok(StatusCounts {
            all,
            preparing,
            shipped,
            delivered,
        })
    }

    async fn commit_order(
        &self,
        mut order: Order,
        consumed_cart_items: &[i64],
    ) -> StoreResult<CommitOutcome> {
        let mut tx = self.pool.begin().await?;

        order.order_number = if order.merchant_uid.is_empty() {
            next_order_number(&mut tx, order.created_at).await?
        } else {
            order.merchant_uid.clone()
        };

        adjust_stock(&mut tx, &order, true).await?;

        let inserted: Option<(i64,)> = sqlx::query_as(
            r#"
            INSERT INTO orders (
                id, order_number, user_id, imp_uid, merchant_uid, items, shipping, payment,
                total_product_amount, shipping_fee, discount_amount, total_amount, total_quantity,
                status, refund_amount, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (merchant_uid) WHERE merchant_uid <> '' DO NOTHING
            RETURNING id
            "#,
        )
        .bind(order.id)
        .bind(&order.order_number)
        .bind(&order.user_id)
        .bind(&order.imp_uid)
        .bind(&order.merchant_uid)
        .bind(Json(&order.items))
        .bind(Json(&order.shipping))
        .bind(Json(&order.payment))
        .bind(order.total_product_amount)
        .bind(order.shipping_fee)
        .bind(order.discount_amount)
        .bind(order.total_amount)
        .bind(order.total_quantity)
        .bind(order.status.as_str())
        .bind(order.refund_amount)
        .bind(order.created_at)
        .bind(order.updated_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| duplicate_order_number(e, &order.order_number))?;

        if inserted.is_none() {
            // Lost the race on the merchant uid: undo the stock decrement
            tx.rollback().await?;
            let existing = self
                .find_order_by_merchant_uid(&order.merchant_uid)
                .await?
                .ok_or_else(|| {
                    StoreError::Corrupt(format!(
                        "merchant uid {} conflicted but no order found",
                        order.merchant_uid
                    ))
                })?;
            return Ok(CommitOutcome::Duplicate(existing));
        }

        if !consumed_cart_items.is_empty() {
            sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND id = ANY($2)")
                .bind(&order.user_id)
                .bind(consumed_cart_items)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(CommitOutcome::Created(order))
    }

    async fn update_order(
        &self,
        order: &Order,
        expected: OrderStatus,
        restore_stock: bool,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = $3, payment = $4,
                shipping_company = $5, tracking_number = $6, shipped_at = $7, delivered_at = $8,
                cancel_reason = $9, cancelled_at = $10, refund_amount = $11, refunded_at = $12,
                updated_at = $13
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(order.id)
        .bind(expected.as_str())
        .bind(order.status.as_str())
        .bind(Json(&order.payment))
        .bind(&order.shipping_company)
        .bind(&order.tracking_number)
        .bind(order.shipped_at)
        .bind(order.delivered_at)
        .bind(&order.cancel_reason)
        .bind(order.cancelled_at)
        .bind(order.refund_amount)
        .bind(order.refunded_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::StaleOrder(order.id));
        }

        if restore_stock {
            adjust_stock(&mut tx, order, false).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("kim"), "%kim%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
