//! Product Model
//!
//! Products are managed by the catalog; this crate only reads them and moves
//! their stock.

use serde::{Deserialize, Serialize};

/// Stock level at or below which a product is flagged `low_stock`
pub const LOW_STOCK_THRESHOLD: i32 = 10;

/// Availability status shown in the storefront
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[default]
    OnSale,
    LowStock,
    SoldOut,
    Discontinued,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnSale => "on_sale",
            Self::LowStock => "low_stock",
            Self::SoldOut => "sold_out",
            Self::Discontinued => "discontinued",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "on_sale" => Some(Self::OnSale),
            "low_stock" => Some(Self::LowStock),
            "sold_out" => Some(Self::SoldOut),
            "discontinued" => Some(Self::Discontinued),
            _ => None,
        }
    }

    /// Status after stock changes to `stock`; `discontinued` never changes
    pub fn for_stock(self, stock: i32) -> Self {
        match self {
            Self::Discontinued => Self::Discontinued,
            _ if stock <= 0 => Self::SoldOut,
            _ if stock <= LOW_STOCK_THRESHOLD => Self::LowStock,
            _ => Self::OnSale,
        }
    }
}

/// Product entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub sku: String,
    pub name: String,
    pub image: String,
    /// Unit price in currency units
    pub price: i64,
    pub stock: i32,
    pub status: ProductStatus,
    pub is_active: bool,
}

impl Product {
    pub fn is_sellable(&self) -> bool {
        self.is_active
            && !matches!(
                self.status,
                ProductStatus::SoldOut | ProductStatus::Discontinued
            )
    }

    /// Set stock and re-derive the availability status
    pub fn set_stock(&mut self, stock: i32) {
        self.stock = stock;
        self.status = self.status.for_stock(stock);
    }
}

/// Product fields embedded in cart views
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub price: i64,
    pub stock: i32,
    pub status: ProductStatus,
}

impl From<&Product> for ProductSummary {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            image: p.image.clone(),
            price: p.price,
            stock: p.stock,
            status: p.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i32, status: ProductStatus) -> Product {
        Product {
            id: 1,
            sku: "SKU-1".into(),
            name: "Linen shirt".into(),
            image: String::new(),
            price: 15_000,
            stock,
            status,
            is_active: true,
        }
    }

    #[test]
    fn status_follows_stock() {
        assert_eq!(ProductStatus::OnSale.for_stock(0), ProductStatus::SoldOut);
        assert_eq!(ProductStatus::OnSale.for_stock(10), ProductStatus::LowStock);
        assert_eq!(ProductStatus::SoldOut.for_stock(11), ProductStatus::OnSale);
        assert_eq!(
            ProductStatus::Discontinued.for_stock(50),
            ProductStatus::Discontinued
        );
    }

    #[test]
    fn sellable_requires_active_and_in_stock_status() {
        assert!(product(5, ProductStatus::LowStock).is_sellable());
        assert!(!product(0, ProductStatus::SoldOut).is_sellable());
        assert!(!product(5, ProductStatus::Discontinued).is_sellable());

        let mut inactive = product(5, ProductStatus::OnSale);
        inactive.is_active = false;
        assert!(!inactive.is_sellable());
    }

    #[test]
    fn set_stock_rederives_status() {
        let mut p = product(12, ProductStatus::OnSale);
        p.set_stock(0);
        assert_eq!(p.status, ProductStatus::SoldOut);
        assert!(!p.is_sellable());
        p.set_stock(3);
        assert_eq!(p.status, ProductStatus::LowStock);
    }

    #[test]
    fn status_string_round_trip() {
        assert_eq!(ProductStatus::parse("low_stock"), Some(ProductStatus::LowStock));
        assert_eq!(ProductStatus::SoldOut.as_str(), "sold_out");
        assert_eq!(ProductStatus::parse("gone"), None);
    }
}
