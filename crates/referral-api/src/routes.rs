use axum::{Router, routing::get};

use crate::messages;
use crate::state::AppState;

/// Every route the service exposes, without transport layers.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(messages::router(state))
}

pub async fn health() -> &'static str {
    "ok"
}
