//! Iamport (PortOne v1) REST client
//!
//! `POST /users/getToken` exchanges the API key pair for an access token,
//! `GET /payments/{imp_uid}` returns the payment record. Every response is
//! wrapped as `{ "code": 0, "message": ..., "response": ... }`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{GatewayPayment, PaymentError, PaymentGateway};

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    response: Option<T>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct PaymentResponse {
    merchant_uid: String,
    status: String,
    amount: serde_json::Number,
}

pub struct IamportGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl IamportGateway {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        })
    }

    /// `imp_uid` is appended as one encoded segment, never parsed as a path
    fn payment_url(&self, imp_uid: &str) -> Result<reqwest::Url, PaymentError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| PaymentError::Unavailable(format!("invalid gateway url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| PaymentError::Unavailable("gateway url cannot be a base".into()))?
            .pop_if_empty()
            .extend(["payments", imp_uid]);
        Ok(url)
    }

    async fn access_token(&self) -> Result<String, PaymentError> {
        let response = self
            .client
            .post(format!("{}/users/getToken", self.base_url))
            .json(&serde_json::json!({
                "imp_key": self.api_key,
                "imp_secret": self.api_secret,
            }))
            .send()
            .await
            .map_err(transport_error)?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Err(PaymentError::GatewayAuth(format!(
                "token request returned {}",
                response.status()
            )));
        }

        let envelope: Envelope<TokenResponse> = read_envelope(response).await?;
        match envelope {
            Envelope {
                code: 0,
                response: Some(token),
                ..
            } => Ok(token.access_token),
            Envelope { code, message, .. } => Err(PaymentError::GatewayAuth(format!(
                "code {code}: {}",
                message.unwrap_or_default()
            ))),
        }
    }
}

#[async_trait]
impl PaymentGateway for IamportGateway {
    async fn fetch_payment(&self, imp_uid: &str) -> Result<GatewayPayment, PaymentError> {
        let token = self.access_token().await?;

        let response = self
            .client
            .get(self.payment_url(imp_uid)?)
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(PaymentError::NotCompleted {
                    status: "not_found".into(),
                });
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(PaymentError::GatewayAuth(format!(
                    "payment lookup returned {}",
                    response.status()
                )));
            }
            _ => {}
        }

        let envelope: Envelope<PaymentResponse> = read_envelope(response).await?;
        let payment = match envelope {
            Envelope {
                code: 0,
                response: Some(payment),
                ..
            } => payment,
            Envelope { code, message, .. } => {
                return Err(PaymentError::Unavailable(format!(
                    "payment lookup failed with code {code}: {}",
                    message.unwrap_or_default()
                )));
            }
        };

        Ok(GatewayPayment {
            amount: whole_amount(&payment.amount)?,
            merchant_uid: payment.merchant_uid,
            status: payment.status,
        })
    }
}

fn transport_error(e: reqwest::Error) -> PaymentError {
    if e.is_timeout() {
        PaymentError::Unavailable("request timed out".into())
    } else {
        PaymentError::Unavailable(e.to_string())
    }
}

async fn read_envelope<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<Envelope<T>, PaymentError> {
    let status = response.status();
    if status.is_server_error() {
        return Err(PaymentError::Unavailable(format!("gateway returned {status}")));
    }
    response
        .json()
        .await
        .map_err(|e| PaymentError::Unavailable(format!("malformed gateway response: {e}")))
}

/// Amounts are whole currency units; anything else is malformed
fn whole_amount(amount: &serde_json::Number) -> Result<i64, PaymentError> {
    if let Some(v) = amount.as_i64() {
        return Ok(v);
    }
    match amount.as_f64() {
        Some(v) if v.fract() == 0.0 && v.abs() < 9.0e15 => Ok(v as i64),
        _ => Err(PaymentError::Unavailable(format!(
            "malformed gateway amount: {amount}"
        ))),
    }
}
