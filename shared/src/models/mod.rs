//! Data models
//!
//! Shared between shop-server and frontend (via API). JSON uses camelCase.
//! All IDs are `i64` snowflakes; money is integer currency units.

pub mod cart;
pub mod order;
pub mod product;

// Re-exports
pub use cart::*;
pub use order::*;
pub use product::*;
