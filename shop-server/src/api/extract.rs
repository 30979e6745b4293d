//! Request extractors that reject with the response envelope

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::order::OrderStatus;
use validator::Validate;

use crate::orders::ListQuery;

/// JSON body; malformed bodies become validation errors
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(json_rejection)?;
        Ok(Self(value))
    }
}

/// JSON body checked with `validator` before it reaches the handler
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let AppJson(value) = AppJson::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Self(value))
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            AppError::invalid_request("Expected Content-Type: application/json")
        }
        other => AppError::validation(other.body_text()),
    }
}

/// Parse a path id; anything that is not an id cannot name an existing resource
pub fn parse_id(raw: &str, code: ErrorCode) -> Result<i64, AppError> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::new(code).with_detail("id", raw))
}

/// Query string of the order list endpoints
///
/// Numbers are parsed leniently: unparseable values fall back to defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub search: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl ListParams {
    pub fn into_query(self) -> Result<ListQuery, AppError> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(s) => Some(s.parse::<OrderStatus>().map_err(|e| {
                AppError::with_message(ErrorCode::ValidationFailed, e.to_string())
                    .with_detail("status", s)
            })?),
        };
        Ok(ListQuery {
            status,
            search: self.search,
            page: self.page.and_then(|p| p.trim().parse().ok()),
            limit: self.limit.and_then(|l| l.trim().parse().ok()),
        })
    }
}
