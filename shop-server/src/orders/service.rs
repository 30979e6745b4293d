use std::collections::HashMap;
use std::sync::Arc;

use shared::error::{AppError, ErrorCode};
use shared::models::{
    CartItem, Order, OrderItem, OrderListPage, PaymentInfo, Product, ShippingAddress,
};
use shared::order::{
    OrderAmounts, OrderStatus, OrderTransition, PaymentMethod, PaymentStatus, is_sequence_number,
};
use shared::util::{now_millis, snowflake_id};

use super::{
    BuyNowRequest, CreateOrderRequest, DEFAULT_ADMIN_PAGE_LIMIT, DEFAULT_PAGE_LIMIT, ListQuery,
    Page, ShippingInfoRequest, StatusUpdateRequest,
};
use crate::config::VerificationMode;
use crate::db::{CommitOutcome, OrderFilter, Store};
use crate::error::{ServiceError, ServiceResult};
use crate::payment::{PaymentReceipt, PaymentVerifier};

/// Result of an order creation request
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub order: Order,
    /// `false` when an earlier order with the same merchant id was returned
    pub created: bool,
}

/// Line to be bought, before it is frozen into an [`OrderItem`]
struct Line {
    product_id: i64,
    quantity: i32,
    selected_color: String,
    selected_size: String,
    /// Captured cart price; `None` uses the live product price
    price: Option<i64>,
}

/// Normalized checkout input shared by both creation paths
struct Checkout {
    shipping: ShippingAddress,
    payment_method: PaymentMethod,
    transaction_id: Option<String>,
    merchant_order_id: Option<String>,
}

impl Checkout {
    fn new(
        shipping: ShippingAddress,
        payment_method: PaymentMethod,
        transaction_id: Option<String>,
        merchant_order_id: Option<String>,
    ) -> Self {
        fn non_empty(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }
        Self {
            shipping,
            payment_method,
            transaction_id: non_empty(transaction_id),
            merchant_order_id: non_empty(merchant_order_id),
        }
    }
}

pub struct OrderService {
    store: Arc<dyn Store>,
    verifier: PaymentVerifier,
}

impl OrderService {
    pub fn new(store: Arc<dyn Store>, verifier: PaymentVerifier) -> Self {
        Self { store, verifier }
    }

    // ========== Creation ==========

    /// Create an order from the selected cart entries (all entries if none selected)
    pub async fn create_from_cart(
        &self,
        user_id: &str,
        req: CreateOrderRequest,
    ) -> ServiceResult<CreateOutcome> {
        let checkout = Checkout::new(
            req.shipping,
            req.payment_method,
            req.transaction_id,
            req.merchant_order_id,
        );
        self.check_receipt(&checkout)?;
        if let Some(existing) = self.find_replay(user_id, &checkout).await? {
            return Ok(existing);
        }

        let cart = self.store.load_cart(user_id).await?;
        if cart.is_empty() {
            return Err(AppError::new(ErrorCode::CartEmpty).into());
        }
        let selected: Vec<CartItem> = if req.item_ids.is_empty() {
            cart
        } else {
            cart.into_iter()
                .filter(|item| req.item_ids.contains(&item.id))
                .collect()
        };
        if selected.is_empty() {
            return Err(AppError::new(ErrorCode::CartNothingSelected).into());
        }

        let consumed: Vec<i64> = selected.iter().map(|item| item.id).collect();
        let lines = selected
            .into_iter()
            .map(|item| Line {
                product_id: item.product_id,
                quantity: item.quantity,
                selected_color: item.selected_color,
                selected_size: item.selected_size,
                price: Some(item.price),
            })
            .collect();

        self.place(user_id, lines, checkout, &consumed).await
    }

    /// Create a single-line order straight from a product, leaving the cart alone
    pub async fn buy_now(&self, user_id: &str, req: BuyNowRequest) -> ServiceResult<CreateOutcome> {
        if req.quantity < 1 {
            return Err(AppError::with_message(
                ErrorCode::ValueOutOfRange,
                "Quantity must be at least 1",
            )
            .into());
        }
        let checkout = Checkout::new(
            req.shipping,
            req.payment_method,
            req.transaction_id,
            req.merchant_order_id,
        );
        self.check_receipt(&checkout)?;
        if let Some(existing) = self.find_replay(user_id, &checkout).await? {
            return Ok(existing);
        }

        let line = Line {
            product_id: req.product_id,
            quantity: req.quantity,
            selected_color: req.selected_color,
            selected_size: req.selected_size,
            price: None,
        };
        self.place(user_id, vec![line], checkout, &[]).await
    }

    /// Shape checks on the receipt ids before any lookup
    fn check_receipt(&self, checkout: &Checkout) -> ServiceResult<()> {
        if let Some(imp_uid) = &checkout.transaction_id
            && !is_gateway_id(imp_uid)
        {
            return Err(AppError::validation("transactionId contains invalid characters")
                .with_detail("field", "transactionId")
                .into());
        }
        if let Some(merchant_uid) = &checkout.merchant_order_id {
            if !is_gateway_id(merchant_uid) {
                return Err(AppError::validation("merchantOrderId contains invalid characters")
                    .with_detail("field", "merchantOrderId")
                    .into());
            }
            // The ORD- namespace belongs to the daily sequence
            if is_sequence_number(merchant_uid) {
                return Err(AppError::validation(
                    "merchantOrderId must not use the ORD-YYYYMMDD-NNNN format",
                )
                .with_detail("field", "merchantOrderId")
                .into());
            }
        }
        // A transaction id alone could mark an order paid without proof
        if self.verifier.mode() == VerificationMode::Enforce
            && checkout.transaction_id.is_some()
            && checkout.merchant_order_id.is_none()
        {
            return Err(AppError::required_field("merchantOrderId").into());
        }
        Ok(())
    }

    async fn find_replay(
        &self,
        user_id: &str,
        checkout: &Checkout,
    ) -> ServiceResult<Option<CreateOutcome>> {
        let Some(merchant_uid) = checkout.merchant_order_id.as_deref() else {
            return Ok(None);
        };
        match self.store.find_order_by_merchant_uid(merchant_uid).await? {
            Some(order) => replay(user_id, order).map(Some),
            None => Ok(None),
        }
    }

    async fn place(
        &self,
        user_id: &str,
        lines: Vec<Line>,
        checkout: Checkout,
        consumed: &[i64],
    ) -> ServiceResult<CreateOutcome> {
        let items = self.snapshot(lines).await?;
        let amounts = OrderAmounts::compute(&items, 0);

        let verified = match &checkout.transaction_id {
            Some(imp_uid) => {
                let receipt = PaymentReceipt {
                    imp_uid: imp_uid.clone(),
                    merchant_uid: checkout.merchant_order_id.clone().unwrap_or_default(),
                };
                self.verifier
                    .verify(&receipt, amounts.total_amount)
                    .await?
                    .verified
            }
            None => false,
        };

        let now = now_millis();
        let paid = checkout.transaction_id.is_some();
        let order = Order {
            id: snowflake_id(),
            order_number: String::new(),
            user_id: user_id.to_string(),
            imp_uid: checkout.transaction_id.unwrap_or_default(),
            merchant_uid: checkout.merchant_order_id.unwrap_or_default(),
            items,
            shipping: checkout.shipping,
            payment: PaymentInfo {
                method: checkout.payment_method,
                status: if paid {
                    PaymentStatus::Completed
                } else {
                    PaymentStatus::Pending
                },
                paid_at: paid.then_some(now),
                verified,
            },
            total_product_amount: amounts.total_product_amount,
            shipping_fee: amounts.shipping_fee,
            discount_amount: amounts.discount_amount,
            total_amount: amounts.total_amount,
            total_quantity: amounts.total_quantity,
            status: if paid {
                OrderStatus::Paid
            } else {
                OrderStatus::Pending
            },
            shipping_company: None,
            tracking_number: None,
            shipped_at: None,
            delivered_at: None,
            cancel_reason: None,
            cancelled_at: None,
            refund_amount: 0,
            refunded_at: None,
            created_at: now,
            updated_at: now,
        };

        match self.store.commit_order(order, consumed).await? {
            CommitOutcome::Created(order) => {
                tracing::info!(
                    order_id = order.id,
                    order_number = %order.order_number,
                    user_id = %order.user_id,
                    total_amount = order.total_amount,
                    status = %order.status,
                    verified = order.payment.verified,
                    "Order created"
                );
                Ok(CreateOutcome {
                    order,
                    created: true,
                })
            }
            // Lost the race to a concurrent request with the same merchant id
            CommitOutcome::Duplicate(order) => replay(user_id, order),
        }
    }

    /// Check availability and freeze each line into an order item
    async fn snapshot(&self, lines: Vec<Line>) -> ServiceResult<Vec<OrderItem>> {
        let mut ids: Vec<i64> = lines.iter().map(|l| l.product_id).collect();
        ids.sort_unstable();
        ids.dedup();

        let products: HashMap<i64, Product> = self
            .store
            .find_products(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut requested: HashMap<i64, i32> = HashMap::new();
        for line in &lines {
            *requested.entry(line.product_id).or_default() += line.quantity;
        }

        for id in &ids {
            let product = products.get(id).ok_or_else(|| {
                AppError::new(ErrorCode::ProductNotFound).with_detail("productId", *id)
            })?;
            if !product.is_sellable() {
                return Err(AppError::with_message(
                    ErrorCode::ProductUnavailable,
                    format!("{} is not available for sale", product.name),
                )
                .with_detail("productId", product.id)
                .into());
            }
            let wanted = requested.get(id).copied().unwrap_or_default();
            if product.stock < wanted {
                return Err(out_of_stock(product, wanted).into());
            }
        }

        Ok(lines
            .into_iter()
            .filter_map(|line| {
                let product = products.get(&line.product_id)?;
                Some(OrderItem {
                    product_id: product.id,
                    name: product.name.clone(),
                    image: product.image.clone(),
                    price: line.price.unwrap_or(product.price),
                    quantity: line.quantity,
                    selected_color: line.selected_color,
                    selected_size: line.selected_size,
                })
            })
            .collect())
    }

    // ========== Customer queries ==========

    pub async fn list_own(&self, user_id: &str, query: ListQuery) -> ServiceResult<OrderListPage> {
        let page = Page::new(query.page, query.limit, DEFAULT_PAGE_LIMIT);
        let filter = OrderFilter {
            owner: Some(user_id.to_string()),
            status: query.status,
            search: None,
            offset: page.offset(),
            limit: page.limit,
        };
        let (orders, total) = self.store.list_orders(&filter).await?;
        let counts = self.store.count_by_status(user_id).await?;
        Ok(OrderListPage::new(orders, total, page.page, page.limit).with_status_counts(counts))
    }

    /// Other customers' orders are reported as not found
    pub async fn get_own(&self, user_id: &str, order_id: i64) -> ServiceResult<Order> {
        self.store
            .find_order(order_id, Some(user_id))
            .await?
            .ok_or_else(|| order_not_found(order_id))
    }

    pub async fn cancel_own(
        &self,
        user_id: &str,
        order_id: i64,
        reason: Option<String>,
    ) -> ServiceResult<Order> {
        let mut order = self.get_own(user_id, order_id).await?;
        let effect = order.cancel_by_customer(reason, now_millis())?;
        self.store
            .update_order(&order, effect.previous, effect.restore_stock)
            .await?;

        tracing::info!(
            order_id = order.id,
            order_number = %order.order_number,
            user_id,
            from = %effect.previous,
            restore_stock = effect.restore_stock,
            "Order cancelled by customer"
        );
        Ok(order)
    }

    // ========== Admin ==========

    pub async fn admin_list(&self, query: ListQuery) -> ServiceResult<OrderListPage> {
        let page = Page::new(query.page, query.limit, DEFAULT_ADMIN_PAGE_LIMIT);
        let filter = OrderFilter {
            owner: None,
            status: query.status,
            search: query
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            offset: page.offset(),
            limit: page.limit,
        };
        let (orders, total) = self.store.list_orders(&filter).await?;
        Ok(OrderListPage::new(orders, total, page.page, page.limit))
    }

    pub async fn admin_get(&self, order_id: i64) -> ServiceResult<Order> {
        self.store
            .find_order(order_id, None)
            .await?
            .ok_or_else(|| order_not_found(order_id))
    }

    pub async fn admin_transition(
        &self,
        admin_id: &str,
        order_id: i64,
        req: StatusUpdateRequest,
    ) -> ServiceResult<Order> {
        let transition = OrderTransition::from_request(
            req.status,
            req.shipping_company,
            req.tracking_number,
            req.cancel_reason,
            req.refund_amount,
        )
        .map_err(AppError::from)?;

        let mut order = self.admin_get(order_id).await?;
        let effect = order
            .apply(transition, now_millis())
            .map_err(AppError::from)?;
        self.store
            .update_order(&order, effect.previous, effect.restore_stock)
            .await?;

        tracing::info!(
            order_id = order.id,
            order_number = %order.order_number,
            admin_id,
            from = %effect.previous,
            to = %order.status,
            restore_stock = effect.restore_stock,
            "Order status changed"
        );
        Ok(order)
    }

    /// Correct carrier or tracking number after shipment
    pub async fn update_shipping_info(
        &self,
        admin_id: &str,
        order_id: i64,
        req: ShippingInfoRequest,
    ) -> ServiceResult<Order> {
        let company = trimmed(req.shipping_company);
        let tracking = trimmed(req.tracking_number);
        if company.is_none() && tracking.is_none() {
            return Err(AppError::validation(
                "shippingCompany or trackingNumber is required",
            )
            .into());
        }

        let mut order = self.admin_get(order_id).await?;
        if !matches!(order.status, OrderStatus::Shipped | OrderStatus::Delivered) {
            return Err(AppError::with_message(
                ErrorCode::ShippingInfoLocked,
                format!("Shipping info cannot be changed while {}", order.status),
            )
            .with_detail("status", order.status.as_str())
            .into());
        }

        if company.is_some() {
            order.shipping_company = company;
        }
        if tracking.is_some() {
            order.tracking_number = tracking;
        }
        order.updated_at = now_millis();
        self.store.update_order(&order, order.status, false).await?;

        tracing::info!(
            order_id = order.id,
            order_number = %order.order_number,
            admin_id,
            "Shipping info updated"
        );
        Ok(order)
    }
}

/// An order already carrying the merchant id; only its owner may see it
fn replay(user_id: &str, order: Order) -> ServiceResult<CreateOutcome> {
    if order.user_id != user_id {
        tracing::warn!(
            merchant_uid = %order.merchant_uid,
            user_id,
            "Merchant order id reused by another user"
        );
        return Err(AppError::conflict(
            ErrorCode::AlreadyExists,
            "Merchant order id is already in use",
        )
        .into());
    }
    tracing::info!(
        order_id = order.id,
        merchant_uid = %order.merchant_uid,
        "Returning existing order for repeated merchant order id"
    );
    Ok(CreateOutcome {
        order,
        created: false,
    })
}

fn out_of_stock(product: &Product, wanted: i32) -> AppError {
    AppError::with_message(
        ErrorCode::ProductOutOfStock,
        format!("Insufficient stock for {}", product.name),
    )
    .with_detail("productId", product.id)
    .with_detail("name", product.name.clone())
    .with_detail("requested", wanted)
    .with_detail("available", product.stock)
}

fn order_not_found(order_id: i64) -> ServiceError {
    AppError::new(ErrorCode::OrderNotFound)
        .with_detail("orderId", order_id.to_string())
        .into()
}

/// Gateway ids travel in URL paths: ASCII letters, digits, `_` and `-` only
fn is_gateway_id(value: &str) -> bool {
    value
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
