//! Shop server configuration

use std::time::Duration;

use crate::BoxError;

/// How client-reported payments are checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationMode {
    /// Every receipt is confirmed with the payment gateway
    Enforce,
    /// Receipts are accepted unverified (local development only)
    Skip,
}

impl VerificationMode {
    fn parse(value: &str) -> Result<Self, BoxError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "enforce" => Ok(Self::Enforce),
            "skip" => Ok(Self::Skip),
            other => {
                Err(format!("PAYMENT_VERIFICATION must be enforce or skip, got {other:?}").into())
            }
        }
    }
}

/// Payment gateway settings
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub mode: VerificationMode,
    pub api_key: String,
    pub api_secret: String,
    pub base_url: String,
    pub timeout: Duration,
}

/// Shop server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment: development | staging | production
    pub environment: String,
    /// PostgreSQL connection URL
    pub database_url: String,
    pub http_port: u16,
    /// HS256 secret shared with the login service
    pub jwt_secret: String,
    pub payment: PaymentConfig,
    pub log_level: String,
    pub log_json: bool,
    /// Daily rolling log files are written here when set
    pub log_dir: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BoxError> {
        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".into());

        let mode = match lookup("PAYMENT_VERIFICATION") {
            Some(v) => VerificationMode::parse(&v)?,
            None => VerificationMode::Enforce,
        };
        if mode == VerificationMode::Skip && environment == "production" {
            return Err("PAYMENT_VERIFICATION=skip is not allowed in production".into());
        }

        let (api_key, api_secret) = match mode {
            VerificationMode::Enforce => (
                require_credential(&lookup, "IAMPORT_API_KEY")?,
                require_credential(&lookup, "IAMPORT_API_SECRET")?,
            ),
            VerificationMode::Skip => (
                lookup("IAMPORT_API_KEY").unwrap_or_default(),
                lookup("IAMPORT_API_SECRET").unwrap_or_default(),
            ),
        };

        let timeout_secs = match lookup("PAYMENT_GATEWAY_TIMEOUT_SECS") {
            Some(v) => v
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| format!("PAYMENT_GATEWAY_TIMEOUT_SECS is invalid: {v:?}"))?,
            None => 10,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").ok_or("DATABASE_URL must be set")?,
            http_port: lookup("HTTP_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            jwt_secret: require_secret(&lookup, "JWT_SECRET", &environment)?,
            payment: PaymentConfig {
                mode,
                api_key,
                api_secret,
                base_url: lookup("IAMPORT_BASE_URL")
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| "https://api.iamport.kr".into()),
                timeout: Duration::from_secs(timeout_secs),
            },
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_json: lookup("LOG_JSON")
                .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes"))
                .unwrap_or(false),
            log_dir: lookup("LOG_DIR").filter(|s| !s.is_empty()),
            environment,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Require a secret env var: must be set and non-empty in non-development environments.
fn require_secret(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    environment: &str,
) -> Result<String, BoxError> {
    let val = match lookup(name) {
        Some(v) => v,
        None => {
            if environment != "development" {
                return Err(format!("{name} must be set in {environment} environment").into());
            }
            format!("dev-{name}-not-for-production")
        }
    };
    if val.is_empty() && environment != "development" {
        return Err(format!("{name} must not be empty in {environment} environment").into());
    }
    Ok(val)
}

/// Gateway credentials are needed whenever payments are verified
fn require_credential(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<String, BoxError> {
    lookup(name)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| format!("{name} must be set when PAYMENT_VERIFICATION=enforce").into())
}
