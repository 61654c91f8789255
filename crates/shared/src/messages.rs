//! WebSocket message types for engine <-> render client communication
//!
//! Every frame is a JSON object tagged by `type_name`.
//!
//! ## Versioning Policy
//!
//! - New variants can be added at the end (forward compatible)
//! - Renaming variants is a breaking change
//! - Unknown inbound variants deserialize to `Unknown` so old servers keep
//!   working with newer clients

use serde::{Deserialize, Serialize};

use chibibot_domain::{Action, Vector2};

// =============================================================================
// Server Messages (Engine → Render client)
// =============================================================================

/// Messages pushed from the engine to every render client in a room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type_name", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// Create or replace a chatter's chibi
    SetOperator(SetOperatorPayload),
    /// Remove a chatter's chibi from the screen
    RemoveOperator { user_name: String },
    /// Show a chat caption above a chatter's chibi
    ShowChatMessage { user_name: String, message: String },
    /// Briefly highlight a chatter's chibi
    FindOperator { user_name: String },
}

impl ServerMessage {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::SetOperator(_) => "SET_OPERATOR",
            Self::RemoveOperator { .. } => "REMOVE_OPERATOR",
            Self::ShowChatMessage { .. } => "SHOW_CHAT_MESSAGE",
            Self::FindOperator { .. } => "FIND_OPERATOR",
        }
    }

    /// The chatter this message is about.
    pub fn user_name(&self) -> &str {
        match self {
            Self::SetOperator(payload) => &payload.user_name,
            Self::RemoveOperator { user_name }
            | Self::ShowChatMessage { user_name, .. }
            | Self::FindOperator { user_name } => user_name,
        }
    }
}

/// Full render description of one chibi.
///
/// Asset paths are already URL paths the client can fetch directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetOperatorPayload {
    pub user_name: String,
    pub user_name_display: String,
    pub operator_id: String,
    pub atlas_file: String,
    pub png_file: String,
    pub skel_file: String,
    pub start_pos: Option<Vector2>,
    pub animation_speed: f64,
    pub available_animations: Vec<String>,
    pub sprite_scale: Option<Vector2>,
    pub max_sprite_pixel_size: i64,
    pub movement_speed_px: i64,
    pub movement_speed: Option<Vector2>,
    /// Serialized as the sibling `action` / `action_data` keys
    #[serde(flatten)]
    pub action: Action,
}

// =============================================================================
// Client Messages (Render client → Engine)
// =============================================================================

/// Messages from a render client to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type_name", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Periodic frame-rate sample
    RuntimeDebugUpdate { average_fps: f64 },
    /// Per-client display preferences
    RuntimeRoomSettings { show_chat_messages: bool },
    /// Any `type_name` this build does not know about
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RuntimeDebugUpdate { .. } => "RUNTIME_DEBUG_UPDATE",
            Self::RuntimeRoomSettings { .. } => "RUNTIME_ROOM_SETTINGS",
            Self::Unknown => "UNKNOWN",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> SetOperatorPayload {
        SetOperatorPayload {
            user_name: "stym".into(),
            user_name_display: "Stym".into(),
            operator_id: "char_002_amiya".into(),
            atlas_file: "/image/assets/a.atlas".into(),
            png_file: "/image/assets/a.png".into(),
            skel_file: "/image/assets/a.skel".into(),
            start_pos: None,
            animation_speed: 1.0,
            available_animations: vec!["Move".into()],
            sprite_scale: None,
            max_sprite_pixel_size: 350,
            movement_speed_px: 80,
            movement_speed: None,
            action: Action::play_one("Move"),
        }
    }

    #[test]
    fn set_operator_flattens_action_next_to_type_name() {
        let value = serde_json::to_value(ServerMessage::SetOperator(payload())).expect("serialize");

        assert_eq!(value["type_name"], "SET_OPERATOR");
        assert_eq!(value["user_name"], "stym");
        assert_eq!(value["action"], "PLAY_ANIMATION");
        assert_eq!(value["action_data"], json!({"animations": ["Move"]}));
        assert_eq!(value["max_sprite_pixel_size"], 350);
    }

    #[test]
    fn remove_operator_wire_shape() {
        let value = serde_json::to_value(ServerMessage::RemoveOperator {
            user_name: "stym".into(),
        })
        .expect("serialize");
        assert_eq!(
            value,
            json!({"type_name": "REMOVE_OPERATOR", "user_name": "stym"})
        );
    }

    #[test]
    fn parses_known_client_messages() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type_name":"RUNTIME_DEBUG_UPDATE","average_fps":59.5}"#,
        )
        .expect("parse");
        assert_eq!(msg, ClientMessage::RuntimeDebugUpdate { average_fps: 59.5 });

        let msg: ClientMessage = serde_json::from_str(
            r#"{"type_name":"RUNTIME_ROOM_SETTINGS","show_chat_messages":false}"#,
        )
        .expect("parse");
        assert_eq!(
            msg,
            ClientMessage::RuntimeRoomSettings {
                show_chat_messages: false
            }
        );
    }

    #[test]
    fn unknown_client_type_is_not_an_error() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type_name":"SOMETHING_NEW","x":1}"#).expect("parse");
        assert_eq!(msg, ClientMessage::Unknown);
    }
}
