//! Health check endpoint

use axum::{Router, routing::get};
use serde::Serialize;
use shared::error::ApiResponse;

use crate::state::AppState;

/// Public route (no auth)
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

pub async fn health_check() -> ApiResponse<HealthResponse> {
    ApiResponse::success(HealthResponse {
        status: "ok",
        service: "shop-server",
        version: env!("CARGO_PKG_VERSION"),
    })
}
