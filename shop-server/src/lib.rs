//! shop-server: storefront order service
//!
//! - Cart management
//! - Checkout with payment verification and atomic stock deduction
//! - Order lifecycle (customer cancel, admin status changes)

pub mod api;
pub mod auth;
pub mod cart;
pub mod config;
pub mod db;
pub mod error;
pub mod logger;
pub mod orders;
pub mod payment;
pub mod state;

pub use config::Config;
pub use state::AppState;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
