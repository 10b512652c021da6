//! HTTP route handlers.

use axum::Router;

use crate::state::AppState;

pub mod extract;
pub mod health;
pub mod stac;

/// Every kernel route, without middleware layers.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(stac::router())
        .merge(health::router())
}
