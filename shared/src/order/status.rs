//! Order, payment and payment-method enums

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order lifecycle status
///
/// ```text
/// pending -> paid -> preparing -> shipped -> delivered
///    |        |  \       |                     |
///    +--------+---+------+-> cancelled         +-> refunded
///             +------------> refunded
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Preparing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        Self::Pending,
        Self::Paid,
        Self::Preparing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
        Self::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Preparing => "preparing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }

    /// Statuses reachable in one step from this one
    pub fn allowed_targets(&self) -> &'static [OrderStatus] {
        match self {
            Self::Pending => &[Self::Paid, Self::Cancelled],
            Self::Paid => &[Self::Preparing, Self::Cancelled, Self::Refunded],
            Self::Preparing => &[Self::Shipped, Self::Cancelled],
            Self::Shipped => &[Self::Delivered],
            Self::Delivered => &[Self::Refunded],
            Self::Cancelled | Self::Refunded => &[],
        }
    }

    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        self.allowed_targets().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Refunded)
    }

    /// Whether an order in this status still has stock deducted for it
    pub fn holds_stock(&self) -> bool {
        !self.is_terminal()
    }

    /// Customers may cancel only before the order is being prepared
    pub fn is_customer_cancellable(&self) -> bool {
        matches!(self, Self::Pending | Self::Paid)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Payment sub-record status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Cancelled,
    Refunded,
}

/// Payment method chosen at checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Card,
    Bank,
    Kakao,
    Naver,
    Toss,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALLOWED: [(OrderStatus, OrderStatus); 9] = [
        (OrderStatus::Pending, OrderStatus::Paid),
        (OrderStatus::Pending, OrderStatus::Cancelled),
        (OrderStatus::Paid, OrderStatus::Preparing),
        (OrderStatus::Paid, OrderStatus::Cancelled),
        (OrderStatus::Paid, OrderStatus::Refunded),
        (OrderStatus::Preparing, OrderStatus::Shipped),
        (OrderStatus::Preparing, OrderStatus::Cancelled),
        (OrderStatus::Shipped, OrderStatus::Delivered),
        (OrderStatus::Delivered, OrderStatus::Refunded),
    ];

    #[test]
    fn transition_table_is_exact() {
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                let expected = ALLOWED.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "{from} -> {to} should be {}",
                    if expected { "allowed" } else { "rejected" }
                );
            }
        }
    }

    #[test]
    fn terminal_statuses_have_no_exits() {
        assert!(OrderStatus::Cancelled.allowed_targets().is_empty());
        assert!(OrderStatus::Refunded.allowed_targets().is_empty());
        assert!(!OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Shipped.holds_stock());
        assert!(!OrderStatus::Refunded.holds_stock());
    }

    #[test]
    fn customer_cancellable_only_before_preparing() {
        let cancellable: Vec<_> = OrderStatus::ALL
            .into_iter()
            .filter(OrderStatus::is_customer_cancellable)
            .collect();
        assert_eq!(cancellable, vec![OrderStatus::Pending, OrderStatus::Paid]);
    }

    #[test]
    fn parse_and_serialize() {
        assert_eq!("shipped".parse::<OrderStatus>(), Ok(OrderStatus::Shipped));
        assert!("SHIPPED".parse::<OrderStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&OrderStatus::Preparing).unwrap(),
            "\"preparing\""
        );
        assert_eq!(
            serde_json::from_str::<PaymentMethod>("\"kakao\"").unwrap(),
            PaymentMethod::Kakao
        );
    }
}
