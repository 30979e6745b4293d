//! Order domain logic
//!
//! - Status enums and the transition table
//! - The state machine ([`Order::apply`](crate::models::Order::apply))
//! - Pricing and order-number formatting

pub mod number;
pub mod pricing;
pub mod status;
pub mod transition;

// Re-exports
pub use number::{day_key, format_order_number, is_sequence_number};
pub use pricing::{FLAT_SHIPPING_FEE, FREE_SHIPPING_THRESHOLD, OrderAmounts};
pub use status::{OrderStatus, PaymentMethod, PaymentStatus, UnknownStatus};
pub use transition::{
    DEFAULT_CUSTOMER_CANCEL_REASON, OrderTransition, TransitionEffect, TransitionError,
};
