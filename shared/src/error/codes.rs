//! Unified error codes for the storefront
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 6xxx: Product errors
//! - 7xxx: Cart errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so the frontend can switch on
/// them without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Admin role required
    AdminRequired = 2003,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order has no items
    OrderEmpty = 4007,
    /// Requested status transition is not allowed
    InvalidStatusTransition = 4008,
    /// Order cannot be cancelled in its current status
    OrderNotCancellable = 4009,
    /// Order was modified by another request
    OrderModified = 4010,
    /// Shipping info can only be edited after shipment
    ShippingInfoLocked = 4011,

    // ==================== 5xxx: Payment ====================
    /// Payment failed
    PaymentFailed = 5001,
    /// Invalid payment method
    PaymentInvalidMethod = 5003,
    /// Refund amount exceeds the order total
    PaymentRefundExceedsAmount = 5005,
    /// Gateway reports the payment as not completed
    PaymentNotCompleted = 5006,
    /// Gateway merchant order id differs from the request
    PaymentOrderMismatch = 5007,
    /// Gateway charged amount differs from the order total
    PaymentAmountMismatch = 5008,
    /// Payment gateway unreachable or returned malformed data
    PaymentGatewayUnavailable = 5009,
    /// Payment gateway rejected the API credentials
    PaymentGatewayAuthFailed = 5010,

    // ==================== 6xxx: Product ====================
    /// Product not found
    ProductNotFound = 6001,
    /// Not enough stock for the requested quantity
    ProductOutOfStock = 6003,
    /// Product is inactive, sold out or discontinued
    ProductUnavailable = 6004,

    // ==================== 7xxx: Cart ====================
    /// Cart is empty
    CartEmpty = 7001,
    /// Cart item not found
    CartItemNotFound = 7002,
    /// No cart items selected
    CartNothingSelected = 7003,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Network error
    NetworkError = 9003,
    /// Operation timeout
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Default human-readable message for the code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            Self::Success => "Operation completed successfully",
            Self::Unknown => "An unknown error occurred",
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::AlreadyExists => "Resource already exists",
            Self::InvalidRequest => "Invalid request",
            Self::RequiredField => "Required field is missing",
            Self::ValueOutOfRange => "Value is out of range",

            // Auth
            Self::NotAuthenticated => "Authentication required",
            Self::TokenExpired => "Token has expired",
            Self::TokenInvalid => "Invalid token",

            // Permission
            Self::PermissionDenied => "Permission denied",
            Self::AdminRequired => "Admin role required",

            // Order
            Self::OrderNotFound => "Order not found",
            Self::OrderEmpty => "Order must contain at least one item",
            Self::InvalidStatusTransition => "Order status transition is not allowed",
            Self::OrderNotCancellable => "Order cannot be cancelled in its current status",
            Self::OrderModified => "Order was modified by another request",
            Self::ShippingInfoLocked => "Shipping info can only be edited for shipped orders",

            // Payment
            Self::PaymentFailed => "Payment failed",
            Self::PaymentInvalidMethod => "Invalid payment method",
            Self::PaymentRefundExceedsAmount => "Refund amount exceeds the order total",
            Self::PaymentNotCompleted => "Payment has not been completed",
            Self::PaymentOrderMismatch => "Payment order id does not match",
            Self::PaymentAmountMismatch => "Payment amount does not match",
            Self::PaymentGatewayUnavailable => "Payment gateway is unavailable",
            Self::PaymentGatewayAuthFailed => "Payment gateway authentication failed",

            // Product
            Self::ProductNotFound => "Product not found",
            Self::ProductOutOfStock => "Insufficient stock",
            Self::ProductUnavailable => "Product is not available for purchase",

            // Cart
            Self::CartEmpty => "Cart is empty",
            Self::CartItemNotFound => "Cart item not found",
            Self::CartNothingSelected => "No cart items selected",

            // System
            Self::InternalError => "Internal server error",
            Self::DatabaseError => "Database error",
            Self::NetworkError => "Network error",
            Self::TimeoutError => "Operation timed out",
            Self::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when converting an unknown numeric code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2003 => Ok(ErrorCode::AdminRequired),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4007 => Ok(ErrorCode::OrderEmpty),
            4008 => Ok(ErrorCode::InvalidStatusTransition),
            4009 => Ok(ErrorCode::OrderNotCancellable),
            4010 => Ok(ErrorCode::OrderModified),
            4011 => Ok(ErrorCode::ShippingInfoLocked),

            // Payment
            5001 => Ok(ErrorCode::PaymentFailed),
            5003 => Ok(ErrorCode::PaymentInvalidMethod),
            5005 => Ok(ErrorCode::PaymentRefundExceedsAmount),
            5006 => Ok(ErrorCode::PaymentNotCompleted),
            5007 => Ok(ErrorCode::PaymentOrderMismatch),
            5008 => Ok(ErrorCode::PaymentAmountMismatch),
            5009 => Ok(ErrorCode::PaymentGatewayUnavailable),
            5010 => Ok(ErrorCode::PaymentGatewayAuthFailed),

            // Product
            6001 => Ok(ErrorCode::ProductNotFound),
            6003 => Ok(ErrorCode::ProductOutOfStock),
            6004 => Ok(ErrorCode::ProductUnavailable),

            // Cart
            7001 => Ok(ErrorCode::CartEmpty),
            7002 => Ok(ErrorCode::CartItemNotFound),
            7003 => Ok(ErrorCode::CartNothingSelected),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::NetworkError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
