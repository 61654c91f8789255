use serde::{Deserialize, Serialize};

use super::action::Action;
use super::kinds::{Facing, Faction, Stance};
use crate::value_objects::Vector2;

/// Everything needed to render one chatter's chibi.
///
/// `skins` and `available_animations` are derived from the catalog and get
/// recomputed on every normalization pass. An `action` of `None` means no
/// action was ever chosen; normalization replaces it with the stance default.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OperatorState {
    #[serde(rename = "operator_display_name")]
    pub display_name: String,
    #[serde(default)]
    pub faction: Faction,
    pub operator_id: String,
    pub skin: String,
    #[serde(rename = "chibi_stance")]
    pub stance: Stance,
    pub facing: Facing,
    pub animation_speed: f64,
    #[serde(default)]
    pub sprite_scale: Option<Vector2>,
    #[serde(default)]
    pub skins: Vec<String>,
    #[serde(default)]
    pub available_animations: Vec<String>,
    #[serde(default)]
    pub start_pos: Option<Vector2>,
    #[serde(default)]
    pub movement_speed: Option<Vector2>,
    #[serde(default)]
    pub action: Option<Action>,
}

impl OperatorState {
    /// A bare request for `operator_id`; normalization fills in the rest.
    pub fn request(operator_id: impl Into<String>, faction: Faction) -> Self {
        Self {
            operator_id: operator_id.into(),
            faction,
            ..Self::default()
        }
    }

    pub fn is_walking(&self) -> bool {
        self.action.as_ref().is_some_and(Action::is_walking)
    }

    /// Animations referenced by the current action, empty when unset.
    pub fn current_animations(&self) -> Vec<String> {
        self.action
            .as_ref()
            .map(|a| a.animations().into_iter().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn set_action(&mut self, action: Action) {
        self.action = Some(action);
    }
}
