//! Payment verification
//!
//! The client pays with the gateway first and then reports the receipt.
//! Before an order is committed the receipt is checked against the gateway:
//! the payment must be `paid`, belong to the same merchant order and match
//! the order total exactly.

pub mod iamport;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::VerificationMode;

pub use iamport::IamportGateway;

/// Gateway-side view of a payment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayPayment {
    pub merchant_uid: String,
    pub status: String,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    #[error("payment is not completed (gateway status: {status})")]
    NotCompleted { status: String },
    #[error("payment belongs to merchant order {actual}, expected {expected}")]
    OrderMismatch { expected: String, actual: String },
    #[error("paid amount {paid} does not match order total {expected}")]
    AmountMismatch { paid: i64, expected: i64 },
    #[error("payment gateway unavailable: {0}")]
    Unavailable(String),
    #[error("payment gateway rejected credentials: {0}")]
    GatewayAuth(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn fetch_payment(&self, imp_uid: &str) -> Result<GatewayPayment, PaymentError>;
}

/// Client-reported payment receipt
#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    pub imp_uid: String,
    pub merchant_uid: String,
}

/// Result of a successful verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verification {
    /// `false` when the check was skipped
    pub verified: bool,
}

#[derive(Clone)]
pub struct PaymentVerifier {
    mode: VerificationMode,
    gateway: Option<Arc<dyn PaymentGateway>>,
}

impl PaymentVerifier {
    pub fn new(mode: VerificationMode, gateway: Option<Arc<dyn PaymentGateway>>) -> Self {
        Self { mode, gateway }
    }

    pub fn enforcing(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self::new(VerificationMode::Enforce, Some(gateway))
    }

    pub fn skipping() -> Self {
        Self::new(VerificationMode::Skip, None)
    }

    pub fn mode(&self) -> VerificationMode {
        self.mode
    }

    /// Confirm the receipt with the gateway; fails closed on any doubt
    pub async fn verify(
        &self,
        receipt: &PaymentReceipt,
        expected_amount: i64,
    ) -> Result<Verification, PaymentError> {
        let gateway = match (self.mode, &self.gateway) {
            (VerificationMode::Skip, _) => {
                tracing::warn!(
                    imp_uid = %receipt.imp_uid,
                    merchant_uid = %receipt.merchant_uid,
                    expected_amount,
                    "Payment verification SKIPPED, accepting receipt unverified"
                );
                return Ok(Verification { verified: false });
            }
            (VerificationMode::Enforce, Some(gateway)) => gateway,
            (VerificationMode::Enforce, None) => {
                return Err(PaymentError::Unavailable(
                    "no payment gateway configured".into(),
                ));
            }
        };

        let payment = gateway.fetch_payment(&receipt.imp_uid).await?;

        if payment.status != "paid" {
            return Err(PaymentError::NotCompleted {
                status: payment.status,
            });
        }
        if payment.merchant_uid != receipt.merchant_uid {
            return Err(PaymentError::OrderMismatch {
                expected: receipt.merchant_uid.clone(),
                actual: payment.merchant_uid,
            });
        }
        if payment.amount != expected_amount {
            return Err(PaymentError::AmountMismatch {
                paid: payment.amount,
                expected: expected_amount,
            });
        }

        tracing::info!(
            imp_uid = %receipt.imp_uid,
            merchant_uid = %receipt.merchant_uid,
            amount = payment.amount,
            "Payment verified"
        );
        Ok(Verification { verified: true })
    }
}
