//! Admin REST request and response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use chibibot_domain::{Faction, Stance, Vector2};

/// One row of `GET /api/rooms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub channel_name: String,
    pub num_chatters: usize,
    pub num_connections: usize,
    pub created_at: DateTime<Utc>,
    pub last_chat_at: DateTime<Utc>,
    #[serde(default)]
    pub connections: Vec<ConnectionSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSummary {
    pub connection_id: Uuid,
    pub average_fps: f64,
    pub show_chat_messages: bool,
}

/// Body of `POST /api/rooms/{channel}/chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectChatRequest {
    pub username: String,
    /// Defaults to `username`
    #[serde(default)]
    pub display_name: Option<String>,
    pub message: String,
}

/// Body of `POST /api/rooms/{channel}/operators`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignOperatorRequest {
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub operator_id: String,
    #[serde(default)]
    pub faction: Faction,
    #[serde(default = "default_skin")]
    pub skin: String,
    #[serde(default)]
    pub stance: Stance,
    #[serde(default)]
    pub start_pos: Option<Vector2>,
}

fn default_skin() -> String {
    chibibot_domain::DEFAULT_SKIN.to_string()
}

/// Counter values reported by `GET /api/metrics`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub rooms_created: u64,
    pub rooms_removed: u64,
    pub connections_opened: u64,
    pub connections_closed: u64,
    pub commands_processed: u64,
    pub chatters_added: u64,
    #[serde(default)]
    pub client_messages_received: u64,
}
