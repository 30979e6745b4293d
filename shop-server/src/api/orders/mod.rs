//! Order API module

mod admin;
mod handler;

use axum::{
    Router, middleware,
    routing::{get, patch, post},
};

use crate::auth::require_admin;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<AppState> {
    let customer_routes = Router::new()
        .route("/", post(handler::create).get(handler::list))
        .route("/buy-now", post(handler::buy_now))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/cancel", patch(handler::cancel));

    let admin_routes = Router::new()
        .route("/admin/all", get(admin::list))
        .route("/admin/{id}", get(admin::get_by_id))
        .route("/admin/{id}/status", patch(admin::update_status))
        .route("/admin/{id}/shipping", patch(admin::update_shipping))
        .route_layer(middleware::from_fn(require_admin));

    customer_routes.merge(admin_routes)
}
