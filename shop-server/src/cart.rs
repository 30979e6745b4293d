//! Cart service

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{Cart, CartItem, CartItemView, Product, ProductSummary};
use validator::Validate;

use crate::db::{NewCartItem, Store};
use crate::error::ServiceResult;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddCartItemRequest {
    pub product_id: i64,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    #[serde(default)]
    pub selected_color: String,
    #[serde(default)]
    pub selected_size: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuantityRequest {
    /// Zero or less removes the entry
    pub quantity: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveItemsRequest {
    #[serde(default)]
    pub item_ids: Vec<i64>,
}

pub struct CartService {
    store: Arc<dyn Store>,
}

impl CartService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Cart entries populated with the current product summary
    pub async fn get(&self, user_id: &str) -> ServiceResult<Cart> {
        let items = self.store.load_cart(user_id).await?;
        let mut ids: Vec<i64> = items.iter().map(|i| i.product_id).collect();
        ids.sort_unstable();
        ids.dedup();

        let products: HashMap<i64, ProductSummary> = self
            .store
            .find_products(&ids)
            .await?
            .iter()
            .map(|p| (p.id, ProductSummary::from(p)))
            .collect();

        let views = items
            .into_iter()
            .map(|item| CartItemView {
                product: products.get(&item.product_id).cloned(),
                item,
            })
            .collect();
        Ok(Cart::new(user_id, views))
    }

    pub async fn add_item(&self, user_id: &str, req: AddCartItemRequest) -> ServiceResult<Cart> {
        if req.quantity < 1 {
            return Err(AppError::with_message(
                ErrorCode::ValueOutOfRange,
                "Quantity must be at least 1",
            )
            .into());
        }

        let product = self.sellable_product(req.product_id).await?;
        let existing = self
            .store
            .load_cart(user_id)
            .await?
            .into_iter()
            .find(|i| i.same_line(req.product_id, &req.selected_color, &req.selected_size))
            .map(|i| i.quantity)
            .unwrap_or(0);
        let merged = existing.saturating_add(req.quantity);
        if merged > product.stock {
            return Err(insufficient_stock(&product, merged).into());
        }

        let item = self
            .store
            .add_cart_item(
                user_id,
                NewCartItem {
                    product_id: product.id,
                    quantity: req.quantity,
                    selected_color: req.selected_color,
                    selected_size: req.selected_size,
                    price: product.price,
                },
            )
            .await?;
        tracing::debug!(user_id, item_id = item.id, quantity = item.quantity, "Cart item added");

        self.get(user_id).await
    }

    pub async fn update_quantity(
        &self,
        user_id: &str,
        item_id: i64,
        quantity: i32,
    ) -> ServiceResult<Cart> {
        let item = self.find_item(user_id, item_id).await?;

        if quantity > 0 {
            let product = self
                .store
                .find_products(&[item.product_id])
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    AppError::new(ErrorCode::ProductNotFound)
                        .with_detail("productId", item.product_id)
                })?;
            if quantity > product.stock {
                return Err(insufficient_stock(&product, quantity).into());
            }
        }

        if !self
            .store
            .set_cart_item_quantity(user_id, item_id, quantity)
            .await?
        {
            return Err(cart_item_not_found(item_id).into());
        }
        self.get(user_id).await
    }

    pub async fn remove_item(&self, user_id: &str, item_id: i64) -> ServiceResult<Cart> {
        if self.store.remove_cart_items(user_id, &[item_id]).await? == 0 {
            return Err(cart_item_not_found(item_id).into());
        }
        self.get(user_id).await
    }

    pub async fn remove_selected(&self, user_id: &str, item_ids: &[i64]) -> ServiceResult<Cart> {
        if item_ids.is_empty() {
            return Err(AppError::new(ErrorCode::CartNothingSelected).into());
        }
        let removed = self.store.remove_cart_items(user_id, item_ids).await?;
        tracing::debug!(user_id, removed, "Cart items removed");
        self.get(user_id).await
    }

    pub async fn clear(&self, user_id: &str) -> ServiceResult<Cart> {
        self.store.clear_cart(user_id).await?;
        Ok(Cart::new(user_id, Vec::new()))
    }

    async fn sellable_product(&self, product_id: i64) -> ServiceResult<Product> {
        let product = self
            .store
            .find_products(&[product_id])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                AppError::new(ErrorCode::ProductNotFound).with_detail("productId", product_id)
            })?;
        if !product.is_sellable() {
            return Err(AppError::with_message(
                ErrorCode::ProductUnavailable,
                format!("{} is not available for sale", product.name),
            )
            .with_detail("productId", product.id)
            .into());
        }
        Ok(product)
    }

    async fn find_item(&self, user_id: &str, item_id: i64) -> ServiceResult<CartItem> {
        self.store
            .load_cart(user_id)
            .await?
            .into_iter()
            .find(|i| i.id == item_id)
            .ok_or_else(|| cart_item_not_found(item_id).into())
    }
}

fn insufficient_stock(product: &Product, requested: i32) -> AppError {
    AppError::with_message(
        ErrorCode::ProductOutOfStock,
        format!("Insufficient stock for {}", product.name),
    )
    .with_detail("productId", product.id)
    .with_detail("requested", requested)
    .with_detail("available", product.stock)
}

fn cart_item_not_found(item_id: i64) -> AppError {
    AppError::new(ErrorCode::CartItemNotFound).with_detail("itemId", item_id)
}
