//! Shared fixtures: in-memory store, stub gateway, sample catalog

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use shared::models::{Product, ProductStatus, ShippingAddress};
use shop_server::cart::{AddCartItemRequest, CartService};
use shop_server::db::{MemoryStore, Store};
use shop_server::orders::OrderService;
use shop_server::payment::{GatewayPayment, PaymentError, PaymentGateway, PaymentVerifier};

/// Gateway that answers from a fixed table of payments
#[derive(Default)]
pub struct StubGateway {
    payments: Mutex<HashMap<String, GatewayPayment>>,
}

impl StubGateway {
    pub fn record_paid(&self, imp_uid: &str, merchant_uid: &str, amount: i64) {
        self.payments.lock().insert(
            imp_uid.to_string(),
            GatewayPayment {
                merchant_uid: merchant_uid.to_string(),
                status: "paid".to_string(),
                amount,
            },
        );
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn fetch_payment(&self, imp_uid: &str) -> Result<GatewayPayment, PaymentError> {
        self.payments
            .lock()
            .get(imp_uid)
            .cloned()
            .ok_or_else(|| PaymentError::NotCompleted {
                status: "not_found".into(),
            })
    }
}

pub struct Shop {
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<StubGateway>,
    pub orders: OrderService,
    pub carts: CartService,
}

impl Shop {
    /// Enforcing verification against the stub gateway
    pub fn new(products: Vec<Product>) -> Self {
        let store = Arc::new(MemoryStore::new());
        for p in products {
            store.insert_product(p);
        }
        let gateway = Arc::new(StubGateway::default());
        let dyn_store: Arc<dyn Store> = store.clone();
        Self {
            orders: OrderService::new(
                dyn_store.clone(),
                PaymentVerifier::enforcing(gateway.clone()),
            ),
            carts: CartService::new(dyn_store),
            store,
            gateway,
        }
    }

    pub fn stock(&self, product_id: i64) -> i32 {
        self.store.stock_of(product_id).unwrap_or(-1)
    }

    /// Add to cart and return the new entry id
    pub async fn add_to_cart(&self, user: &str, product_id: i64, quantity: i32) -> i64 {
        let cart = self
            .carts
            .add_item(
                user,
                AddCartItemRequest {
                    product_id,
                    quantity,
                    selected_color: String::new(),
                    selected_size: String::new(),
                },
            )
            .await
            .unwrap();
        cart.items
            .iter()
            .find(|v| v.item.product_id == product_id)
            .map(|v| v.item.id)
            .unwrap()
    }
}

pub fn product(id: i64, price: i64, stock: i32) -> Product {
    Product {
        id,
        sku: format!("SKU-{id}"),
        name: format!("Product {id}"),
        image: format!("https://cdn.example.com/{id}.jpg"),
        price,
        stock,
        status: ProductStatus::OnSale.for_stock(stock),
        is_active: true,
    }
}

pub fn shipping() -> ShippingAddress {
    ShippingAddress {
        recipient_name: "Kim Minji".into(),
        recipient_phone: "010-1234-5678".into(),
        postal_code: "06236".into(),
        address: "Teheran-ro 152, Gangnam-gu".into(),
        address_detail: "12F".into(),
        delivery_memo: String::new(),
    }
}
