//! Unified service-layer error type
//!
//! `ServiceError` bridges storage and gateway errors and the API-layer error
//! (`AppError`), so services can use `?` everywhere and handlers only see
//! `AppError`.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

use crate::BoxError;
use crate::db::StoreError;
use crate::payment::PaymentError;

/// Service-layer error
///
/// - `Db`: Database/infrastructure errors (logged, mapped to InternalError)
/// - `App`: Business-rule errors (passed through to the client)
#[derive(Debug)]
pub enum ServiceError {
    Db(BoxError),
    App(AppError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        ServiceError::Db(e.into())
    }
}

impl From<BoxError> for ServiceError {
    fn from(e: BoxError) -> Self {
        ServiceError::Db(e)
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InsufficientStock { product_id, name } => ServiceError::App(
                AppError::with_message(
                    ErrorCode::ProductOutOfStock,
                    format!("Insufficient stock for {name}"),
                )
                .with_detail("productId", product_id)
                .with_detail("name", name),
            ),
            StoreError::StaleOrder(id) => ServiceError::App(
                AppError::new(ErrorCode::OrderModified).with_detail("orderId", id.to_string()),
            ),
            StoreError::DuplicateOrderNumber(number) => ServiceError::App(
                AppError::conflict(
                    ErrorCode::AlreadyExists,
                    format!("Order number {number} already exists"),
                )
                .with_detail("orderNumber", number),
            ),
            StoreError::Corrupt(msg) => ServiceError::Db(msg.into()),
            StoreError::Database(e) => ServiceError::Db(e.into()),
        }
    }
}

impl From<PaymentError> for ServiceError {
    fn from(e: PaymentError) -> Self {
        let code = match &e {
            PaymentError::NotCompleted { .. } => ErrorCode::PaymentNotCompleted,
            PaymentError::OrderMismatch { .. } => ErrorCode::PaymentOrderMismatch,
            PaymentError::AmountMismatch { .. } => ErrorCode::PaymentAmountMismatch,
            PaymentError::Unavailable(_) => ErrorCode::PaymentGatewayUnavailable,
            PaymentError::GatewayAuth(_) => ErrorCode::PaymentGatewayAuthFailed,
        };

        let err = match &e {
            // Upstream details stay in the log
            PaymentError::Unavailable(_) | PaymentError::GatewayAuth(_) => {
                tracing::error!(error = %e, "Payment gateway failure");
                AppError::new(code)
            }
            PaymentError::AmountMismatch { paid, expected } => {
                AppError::with_message(code, e.to_string())
                    .with_detail("paid", *paid)
                    .with_detail("expected", *expected)
            }
            _ => AppError::with_message(code, e.to_string()),
        };
        ServiceError::App(err)
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Db(db_err) => {
                tracing::error!(error = %db_err, "Service database error");
                AppError::new(ErrorCode::DatabaseError)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

/// Convenience type alias for service-layer results
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    fn app(e: impl Into<ServiceError>) -> AppError {
        AppError::from(e.into())
    }

    #[test]
    fn insufficient_stock_names_the_product() {
        let err = app(StoreError::InsufficientStock {
            product_id: 7,
            name: "Linen shirt".into(),
        });
        assert_eq!(err.code, ErrorCode::ProductOutOfStock);
        assert!(err.message.contains("Linen shirt"));
        assert_eq!(err.http_status(), StatusCode::CONFLICT);
    }

    #[test]
    fn payment_failures_keep_distinct_codes() {
        assert_eq!(
            app(PaymentError::NotCompleted {
                status: "ready".into()
            })
            .code,
            ErrorCode::PaymentNotCompleted
        );
        let mismatch = app(PaymentError::AmountMismatch {
            paid: 1_000,
            expected: 45_000,
        });
        assert_eq!(mismatch.code, ErrorCode::PaymentAmountMismatch);
        assert_eq!(mismatch.http_status(), StatusCode::PAYMENT_REQUIRED);

        let upstream = app(PaymentError::Unavailable("connect refused".into()));
        assert_eq!(upstream.code, ErrorCode::PaymentGatewayUnavailable);
        assert!(!upstream.message.contains("refused"));
        assert_eq!(upstream.http_status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn taken_order_number_is_a_conflict() {
        let err = app(StoreError::DuplicateOrderNumber("ORD-20261018-0001".into()));
        assert_eq!(err.code, ErrorCode::AlreadyExists);
        assert_eq!(err.details.as_ref().unwrap()["orderNumber"], "ORD-20261018-0001");
    }

    #[test]
    fn infrastructure_errors_are_opaque() {
        let err = app(StoreError::Corrupt("bad status".into()));
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, ErrorCode::DatabaseError.message());
    }
}
