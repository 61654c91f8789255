//! API layer - HTTP and WebSocket entry points.

pub mod http;
pub mod websocket;

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::app::App;

/// Every route, with state applied.
pub fn router(app: Arc<App>) -> Router {
    http::routes()
        .route("/ws", get(websocket::ws_handler))
        .route("/ws/", get(websocket::ws_handler))
        .with_state(app)
}
