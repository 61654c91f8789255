//! What a chibi is doing on screen.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value_objects::Vector2;

/// The behaviour driving a chibi. Switching kinds replaces the payload.
///
/// On the wire this is adjacently tagged: `{"action": "WALK_TO",
/// "action_data": {...}}`, which is the shape render clients expect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "action",
    content = "action_data",
    rename_all = "SCREAMING_SNAKE_CASE"
)]
pub enum Action {
    /// Loop through a fixed list of animations in place.
    PlayAnimation { animations: Vec<String> },
    /// Roam the screen at random.
    Wander {
        #[serde(rename = "wander_animation")]
        animation: String,
    },
    /// Walk to a point and settle there.
    WalkTo {
        #[serde(rename = "target_pos")]
        target: Option<Vector2>,
        #[serde(rename = "walk_to_animation")]
        walk_animation: String,
        #[serde(rename = "walk_to_final_animation")]
        arrival_animation: String,
    },
    /// Walk back and forth between two points.
    PaceAround {
        #[serde(rename = "pace_start_pos")]
        start: Option<Vector2>,
        #[serde(rename = "pace_end_pos")]
        end: Option<Vector2>,
        #[serde(rename = "pace_around_animation")]
        animation: String,
    },
    /// Trail another chatter's chibi.
    Follow {
        #[serde(rename = "action_follow_target")]
        target: String,
        #[serde(rename = "action_follow_walk_animation")]
        walk_animation: String,
        #[serde(rename = "action_follow_idle_animation")]
        idle_animation: String,
    },
}

/// Tag-only view of [`Action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    PlayAnimation,
    Wander,
    WalkTo,
    PaceAround,
    Follow,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlayAnimation => "PLAY_ANIMATION",
            Self::Wander => "WANDER",
            Self::WalkTo => "WALK_TO",
            Self::PaceAround => "PACE_AROUND",
            Self::Follow => "FOLLOW",
        }
    }

    pub fn is_walking(&self) -> bool {
        !matches!(self, Self::PlayAnimation)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Action {
    pub fn play(animations: Vec<String>) -> Self {
        Self::PlayAnimation { animations }
    }

    pub fn play_one(animation: impl Into<String>) -> Self {
        Self::PlayAnimation {
            animations: vec![animation.into()],
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Self::PlayAnimation { .. } => ActionKind::PlayAnimation,
            Self::Wander { .. } => ActionKind::Wander,
            Self::WalkTo { .. } => ActionKind::WalkTo,
            Self::PaceAround { .. } => ActionKind::PaceAround,
            Self::Follow { .. } => ActionKind::Follow,
        }
    }

    pub fn is_walking(&self) -> bool {
        self.kind().is_walking()
    }

    /// Every animation name this action references.
    pub fn animations(&self) -> Vec<&str> {
        match self {
            Self::PlayAnimation { animations } => animations.iter().map(String::as_str).collect(),
            Self::Wander { animation } | Self::PaceAround { animation, .. } => {
                vec![animation.as_str()]
            }
            Self::WalkTo {
                walk_animation,
                arrival_animation,
                ..
            } => vec![walk_animation.as_str(), arrival_animation.as_str()],
            Self::Follow {
                walk_animation,
                idle_animation,
                ..
            } => vec![walk_animation.as_str(), idle_animation.as_str()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_adjacently_tagged() {
        let action = Action::WalkTo {
            target: Some(Vector2::new(0.5, 0.0)),
            walk_animation: "Move".into(),
            arrival_animation: "Relax".into(),
        };
        let value = serde_json::to_value(&action).expect("serialize");
        assert_eq!(
            value,
            json!({
                "action": "WALK_TO",
                "action_data": {
                    "target_pos": {"x": 0.5, "y": 0.0},
                    "walk_to_animation": "Move",
                    "walk_to_final_animation": "Relax",
                }
            })
        );
    }

    #[test]
    fn only_play_animation_is_stationary() {
        assert!(!Action::play_one("Idle").is_walking());
        assert!(Action::Wander {
            animation: "Move".into()
        }
        .is_walking());
        assert!(ActionKind::Follow.is_walking());
    }

    #[test]
    fn follow_references_both_animations() {
        let action = Action::Follow {
            target: "someone".into(),
            walk_animation: "Move".into(),
            idle_animation: "Relax".into(),
        };
        assert_eq!(action.animations(), vec!["Move", "Relax"]);
    }
}
