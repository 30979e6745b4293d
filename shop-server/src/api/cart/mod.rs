//! Cart API module

mod handler;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/cart", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handler::get).delete(handler::clear))
        .route(
            "/items",
            post(handler::add_item).delete(handler::remove_selected),
        )
        .route(
            "/items/{item_id}",
            patch(handler::update_quantity).delete(handler::remove_item),
        )
}
