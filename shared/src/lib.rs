//! Shared types for the storefront
//!
//! Models, the error system and pure order logic used by shop-server and
//! mirrored by the frontend.

pub mod error;
pub mod models;
pub mod order;
pub mod util;

// Re-exports
pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
pub use http;
pub use serde::{Deserialize, Serialize};
