//! Application state and composition.

use std::sync::Arc;

use crate::infrastructure::chat::LocalChatHub;
use crate::infrastructure::ports::MetricsSink;
use crate::rooms::RoomRegistry;

/// Main application state.
///
/// Passed to HTTP/WebSocket handlers via Axum state.
pub struct App {
    pub rooms: Arc<RoomRegistry>,
    /// Entry point for chat lines injected over the admin API.
    pub chat: Arc<LocalChatHub>,
    pub metrics: Arc<dyn MetricsSink>,
}

impl App {
    pub fn new(
        rooms: Arc<RoomRegistry>,
        chat: Arc<LocalChatHub>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            rooms,
            chat,
            metrics,
        }
    }
}
