//! API routes for shop-server

pub mod cart;
pub mod extract;
pub mod health;
pub mod orders;

use axum::{Router, middleware};
use http::{HeaderName, HeaderValue};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::auth::require_auth;
use crate::state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request ID generator
#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// All routes; everything under `/api` requires a bearer token
pub fn build_router(state: &AppState) -> Router<AppState> {
    let api = Router::new()
        .merge(orders::router())
        .merge(cart::router())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new().merge(health::router()).merge(api)
}

/// Fully configured application, used by the HTTP server and by tests
pub fn build_app(state: AppState) -> Router {
    build_router(&state)
        // CORS - Handle cross-origin requests
        .layer(CorsLayer::permissive())
        // Propagate request ID to response
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            REQUEST_ID_HEADER,
        )))
        // Trace - Request tracing (logs at INFO level)
        .layer(TraceLayer::new_for_http())
        // Request ID - outermost so traces carry it
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
            XRequestId,
        ))
        .with_state(state)
}
