//! Application state for shop-server

use std::sync::Arc;

use crate::BoxError;
use crate::auth::JwtService;
use crate::cart::CartService;
use crate::config::{Config, VerificationMode};
use crate::db::{PgStore, Store};
use crate::orders::OrderService;
use crate::payment::{IamportGateway, PaymentVerifier};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderService>,
    pub carts: Arc<CartService>,
    /// Validates bearer tokens issued by the login service
    pub jwt: JwtService,
}

impl AppState {
    /// Connect to PostgreSQL, run migrations and set up payment verification
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let store = PgStore::connect(&config.database_url).await?;
        tracing::info!("Database connected, migrations applied");

        let verifier = match config.payment.mode {
            VerificationMode::Enforce => {
                let gateway = IamportGateway::new(
                    config.payment.base_url.clone(),
                    config.payment.api_key.clone(),
                    config.payment.api_secret.clone(),
                    config.payment.timeout,
                )?;
                tracing::info!(
                    base_url = %config.payment.base_url,
                    timeout_secs = config.payment.timeout.as_secs(),
                    "Payment verification enforced"
                );
                PaymentVerifier::enforcing(Arc::new(gateway))
            }
            VerificationMode::Skip => {
                tracing::warn!(
                    environment = %config.environment,
                    "PAYMENT VERIFICATION IS DISABLED: orders with a transaction id are accepted unverified"
                );
                PaymentVerifier::skipping()
            }
        };

        Ok(Self::from_parts(
            Arc::new(store),
            verifier,
            &config.jwt_secret,
        ))
    }

    /// Assemble state from an existing store and verifier
    pub fn from_parts(store: Arc<dyn Store>, verifier: PaymentVerifier, jwt_secret: &str) -> Self {
        Self {
            orders: Arc::new(OrderService::new(store.clone(), verifier)),
            carts: Arc::new(CartService::new(store)),
            jwt: JwtService::new(jwt_secret),
        }
    }
}
