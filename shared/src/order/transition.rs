//! Order state machine
//!
//! Every status change goes through [`Order::apply`]: it validates the move
//! against the transition table, applies the side effects to the order and
//! reports whether deducted stock has to be given back.

use super::status::{OrderStatus, PaymentStatus};
use crate::error::{AppError, ErrorCode};
use crate::models::Order;
use thiserror::Error;

pub const DEFAULT_CUSTOMER_CANCEL_REASON: &str = "Cancelled at customer request";

/// A requested status change with the data it needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderTransition {
    MarkPaid,
    StartPreparing,
    Ship {
        shipping_company: String,
        tracking_number: String,
    },
    Deliver,
    Cancel {
        reason: String,
    },
    /// `None` refunds the full order total
    Refund {
        amount: Option<i64>,
    },
}

impl OrderTransition {
    pub fn target(&self) -> OrderStatus {
        match self {
            Self::MarkPaid => OrderStatus::Paid,
            Self::StartPreparing => OrderStatus::Preparing,
            Self::Ship { .. } => OrderStatus::Shipped,
            Self::Deliver => OrderStatus::Delivered,
            Self::Cancel { .. } => OrderStatus::Cancelled,
            Self::Refund { .. } => OrderStatus::Refunded,
        }
    }

    /// Build a transition from loosely typed admin input.
    ///
    /// Required companions (carrier and tracking for `shipped`, reason for
    /// `cancelled`) are checked here, before any order is touched.
    pub fn from_request(
        status: OrderStatus,
        shipping_company: Option<String>,
        tracking_number: Option<String>,
        cancel_reason: Option<String>,
        refund_amount: Option<i64>,
    ) -> Result<Self, TransitionError> {
        fn required(value: Option<String>, field: &'static str) -> Result<String, TransitionError> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(TransitionError::MissingField(field))
        }

        match status {
            OrderStatus::Pending => Err(TransitionError::Illegal {
                from: None,
                to: OrderStatus::Pending,
            }),
            OrderStatus::Paid => Ok(Self::MarkPaid),
            OrderStatus::Preparing => Ok(Self::StartPreparing),
            OrderStatus::Shipped => Ok(Self::Ship {
                shipping_company: required(shipping_company, "shippingCompany")?,
                tracking_number: required(tracking_number, "trackingNumber")?,
            }),
            OrderStatus::Delivered => Ok(Self::Deliver),
            OrderStatus::Cancelled => Ok(Self::Cancel {
                reason: required(cancel_reason, "cancelReason")?,
            }),
            OrderStatus::Refunded => Ok(Self::Refund {
                amount: refund_amount,
            }),
        }
    }
}

/// What the store must do besides persisting the order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionEffect {
    pub previous: OrderStatus,
    /// Line item quantities go back to product stock
    pub restore_stock: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// `from` is `None` when the target can never be reached by a transition
    #[error("cannot change order status from {} to {to}", from.map(|s| s.as_str()).unwrap_or("any status"))]
    Illegal {
        from: Option<OrderStatus>,
        to: OrderStatus,
    },
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("refund amount {amount} must be between 0 and {total}")]
    InvalidRefundAmount { amount: i64, total: i64 },
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        match &err {
            TransitionError::Illegal { from, to } => {
                let e = AppError::with_message(ErrorCode::InvalidStatusTransition, err.to_string())
                    .with_detail("to", to.as_str());
                match from {
                    Some(from) => e.with_detail("from", from.as_str()),
                    None => e,
                }
            }
            TransitionError::MissingField(field) => AppError::required_field(field),
            TransitionError::InvalidRefundAmount { total, .. } => {
                AppError::with_message(ErrorCode::PaymentRefundExceedsAmount, err.to_string())
                    .with_detail("max", *total)
            }
        }
    }
}

impl Order {
    /// Apply a transition at time `now`.
    ///
    /// On error the order is left untouched.
    pub fn apply(
        &mut self,
        transition: OrderTransition,
        now: i64,
    ) -> Result<TransitionEffect, TransitionError> {
        let previous = self.status;
        let target = transition.target();

        if !previous.can_transition_to(target) {
            return Err(TransitionError::Illegal {
                from: Some(previous),
                to: target,
            });
        }

        match transition {
            OrderTransition::MarkPaid => {
                self.payment.status = PaymentStatus::Completed;
                self.payment.paid_at = Some(now);
            }
            OrderTransition::StartPreparing => {}
            OrderTransition::Ship {
                shipping_company,
                tracking_number,
            } => {
                self.shipping_company = Some(shipping_company);
                self.tracking_number = Some(tracking_number);
                self.shipped_at = Some(now);
            }
            OrderTransition::Deliver => {
                self.delivered_at = Some(now);
            }
            OrderTransition::Cancel { reason } => {
                self.cancel_reason = Some(reason);
                self.cancelled_at = Some(now);
                self.payment.status = PaymentStatus::Cancelled;
            }
            OrderTransition::Refund { amount } => {
                let amount = amount.unwrap_or(self.total_amount);
                if !(0..=self.total_amount).contains(&amount) {
                    return Err(TransitionError::InvalidRefundAmount {
                        amount,
                        total: self.total_amount,
                    });
                }
                self.refund_amount = amount;
                self.refunded_at = Some(now);
                self.payment.status = PaymentStatus::Refunded;
            }
        }

        self.status = target;
        self.updated_at = now;

        Ok(TransitionEffect {
            previous,
            restore_stock: target.is_terminal() && previous.holds_stock(),
        })
    }

    /// Customer cancellation: only allowed before preparation starts
    pub fn cancel_by_customer(
        &mut self,
        reason: Option<String>,
        now: i64,
    ) -> Result<TransitionEffect, AppError> {
        if !self.status.is_customer_cancellable() {
            return Err(AppError::with_message(
                ErrorCode::OrderNotCancellable,
                format!("Order cannot be cancelled while {}", self.status),
            )
            .with_detail("status", self.status.as_str()));
        }

        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_CUSTOMER_CANCEL_REASON.to_string());

        Ok(self.apply(OrderTransition::Cancel { reason }, now)?)
    }
}
