//! Chibi Bot Protocol - types shared by the engine and its clients
//!
//! - Render-client websocket messages (`ServerMessage`, `ClientMessage`)
//! - Admin REST request/response DTOs
//!
//! No business logic lives here; only data and serialization.

pub mod admin;
pub mod messages;

pub use admin::{
    AssignOperatorRequest, ConnectionSummary, InjectChatRequest, MetricsSnapshot, RoomSummary,
};
pub use messages::{ClientMessage, ServerMessage, SetOperatorPayload};
