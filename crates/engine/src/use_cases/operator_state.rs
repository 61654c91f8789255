//! Operator state validation and normalization.
//!
//! Every state that reaches a render client goes through
//! [`OperatorStateService::normalize`] first. The pass is idempotent and only
//! fails when the operator id itself is unknown; every other problem is
//! repaired by falling back to something the catalog actually has.

use std::sync::{Arc, RwLock};

use chibibot_domain::{
    clamp_f64, filter_animations, move_animations, Action, DomainError, Facing, Faction,
    OperatorState, RuntimeConfig, Stance, Vector2, DEFAULT_SKIN,
};

use crate::infrastructure::ports::{
    CatalogError, NameMatch, OperatorCatalog, RandomPort, SpineAssets,
};
use crate::infrastructure::settings::InitialOperatorDetails;

const DEFAULT_OPERATOR_NAME: &str = "Amiya";
const DEFAULT_WALK_TARGET: Vector2 = Vector2::new(0.5, 0.5);
const DEFAULT_PACE_START: Vector2 = Vector2::new(0.1, 0.0);
const DEFAULT_PACE_END: Vector2 = Vector2::new(0.5, 0.0);

#[derive(Debug, thiserror::Error)]
pub enum OperatorError {
    #[error("unknown {faction} ({operator_id})")]
    UnknownOperator {
        operator_id: String,
        faction: Faction,
    },
    #[error("no operator or enemy named {0}")]
    NoMatch(String),
    #[error("catalog has no operators")]
    EmptyCatalog,
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Invalid(#[from] DomainError),
}

/// Validates and normalizes operator states for one room.
pub struct OperatorStateService {
    catalog: Arc<dyn OperatorCatalog>,
    random: Arc<dyn RandomPort>,
    config: RwLock<RuntimeConfig>,
}

impl OperatorStateService {
    pub fn new(
        catalog: Arc<dyn OperatorCatalog>,
        random: Arc<dyn RandomPort>,
        config: RuntimeConfig,
    ) -> Result<Self, OperatorError> {
        config.validate()?;
        Ok(Self {
            catalog,
            random,
            config: RwLock::new(config),
        })
    }

    pub fn catalog(&self) -> &Arc<dyn OperatorCatalog> {
        &self.catalog
    }

    /// Current bounds.
    pub fn config(&self) -> RuntimeConfig {
        match self.config.read() {
            Ok(config) => config.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the bounds. The old config stays if `config` is invalid.
    pub fn set_config(&self, config: RuntimeConfig) -> Result<(), OperatorError> {
        config.validate()?;
        match self.config.write() {
            Ok(mut current) => *current = config,
            Err(poisoned) => *poisoned.into_inner() = config,
        }
        Ok(())
    }

    pub fn resolve_name(&self, name: &str, faction: Faction) -> NameMatch {
        self.catalog.resolve_name(name, faction)
    }

    pub fn display_name(&self, operator_id: &str, faction: Faction) -> Option<String> {
        self.catalog
            .operator(operator_id, faction)
            .ok()
            .map(|record| record.display_name.clone())
    }

    /// Bring `state` in line with the catalog and the current bounds.
    pub fn normalize(&self, state: OperatorState) -> Result<OperatorState, OperatorError> {
        let config = self.config();
        let mut state = state;

        // Faction always has a value; the operator must exist for it.
        let record = self
            .catalog
            .operator(&state.operator_id, state.faction)
            .map_err(|_| OperatorError::UnknownOperator {
                operator_id: state.operator_id.clone(),
                faction: state.faction,
            })?;
        state.display_name = record.display_name.clone();

        // Skin
        if !record.skins.contains_key(&state.skin) {
            state.skin = if record.skins.contains_key(DEFAULT_SKIN) {
                DEFAULT_SKIN.to_string()
            } else {
                record.skins.keys().next().cloned().unwrap_or_default()
            };
        }
        let skin = record.skins.get(&state.skin);

        // Stance
        if let Some(skin) = skin {
            if !skin.has_stance(state.stance) {
                let other = state.stance.other();
                state.stance = if skin.has_stance(other) {
                    other
                } else {
                    Stance::Base
                };
            }
        }

        // Facing
        let assets = skin.and_then(|s| s.assets(state.stance, state.facing));
        let assets = match assets {
            Some(assets) => Some(assets),
            None => {
                state.facing = Facing::Front;
                skin.and_then(|s| s.assets(state.stance, Facing::Front))
            }
        };

        // Available animations
        state.skins = record.skin_names();
        state.available_animations = assets
            .map(|a| filter_animations(&a.animations))
            .unwrap_or_default();

        // Bounded numbers
        if state.animation_speed == 0.0 || !state.animation_speed.is_finite() {
            state.animation_speed = config.default_animation_speed;
        }
        state.animation_speed = clamp_f64(
            state.animation_speed,
            config.min_animation_speed,
            config.max_animation_speed,
        );
        state.sprite_scale = state
            .sprite_scale
            .map(|v| v.clamped(config.min_scale_size, config.max_scale_size));
        state.movement_speed = state
            .movement_speed
            .map(|v| v.clamped(config.min_movement_speed, config.max_movement_speed));
        state.start_pos = state.start_pos.map(Vector2::clamped_unit);

        // An action must be set
        let action = state
            .action
            .take()
            .unwrap_or_else(|| Action::play_one(state.stance.default_animation()));

        // Operator battle chibis have no move animations
        let action = if state.faction == Faction::Operator
            && state.stance == Stance::Battle
            && action.is_walking()
        {
            Action::play_one(state.stance.default_animation())
        } else {
            action
        };

        // Every referenced animation must exist
        state.action = Some(self.repair_animations(action, &state));
        Ok(state)
    }

    fn repair_animations(&self, action: Action, state: &OperatorState) -> Action {
        let available = &state.available_animations;
        let stance_default = state.stance.default_animation();
        let idle = state.stance.idle_animation();
        let moves = move_animations(available);
        let move_default = moves.first().map(String::as_str).unwrap_or(stance_default);

        match action {
            Action::PlayAnimation { animations } => Action::PlayAnimation {
                animations: valid_animations(available, animations, stance_default),
            },
            Action::Wander { animation } => Action::Wander {
                animation: valid_animation(available, animation, move_default),
            },
            Action::WalkTo {
                target,
                walk_animation,
                arrival_animation,
            } => Action::WalkTo {
                target: Some(target.unwrap_or(DEFAULT_WALK_TARGET).clamped_unit()),
                walk_animation: valid_animation(available, walk_animation, move_default),
                arrival_animation: valid_animation(available, arrival_animation, idle),
            },
            Action::PaceAround {
                start,
                end,
                animation,
            } => Action::PaceAround {
                start: Some(start.unwrap_or(DEFAULT_PACE_START).clamped_unit()),
                end: Some(end.unwrap_or(DEFAULT_PACE_END).clamped_unit()),
                animation: valid_animation(available, animation, move_default),
            },
            Action::Follow {
                target,
                walk_animation,
                idle_animation,
            } => Action::Follow {
                target,
                walk_animation: valid_animation(available, walk_animation, move_default),
                idle_animation: valid_animation(available, idle_animation, idle),
            },
        }
    }

    /// Assets for an already-normalized state, checking every animation its
    /// action references.
    pub fn validated_assets(&self, state: &OperatorState) -> Result<SpineAssets, CatalogError> {
        self.catalog.contains(
            &state.operator_id,
            state.faction,
            &state.skin,
            state.stance,
            state.facing,
            &state.current_animations(),
        )?;
        self.catalog.resolve(
            &state.operator_id,
            state.faction,
            &state.skin,
            state.stance,
            state.facing,
        )
    }

    /// A uniformly chosen operator in its default skin.
    pub fn random_operator(&self) -> Result<OperatorState, OperatorError> {
        let ids = self.catalog.operator_ids(Faction::Operator);
        if ids.is_empty() {
            return Err(OperatorError::EmptyCatalog);
        }
        let index = self.random.gen_index(ids.len()).min(ids.len() - 1);
        let operator_id = &ids[index];

        let record = self.catalog.operator(operator_id, Faction::Operator)?;
        let stance = match record.skins.get(DEFAULT_SKIN) {
            Some(skin) if skin.has_stance(Stance::Base) => Stance::Base,
            _ => Stance::Battle,
        };

        let state = OperatorState {
            display_name: record.display_name.clone(),
            faction: Faction::Operator,
            operator_id: operator_id.clone(),
            skin: DEFAULT_SKIN.to_string(),
            stance,
            facing: Facing::Front,
            animation_speed: self.config().default_animation_speed,
            action: Some(Action::play_one(stance.default_animation())),
            ..OperatorState::default()
        };
        self.normalize(state)
    }

    /// Starting state for a broadcaster from configured defaults.
    ///
    /// The name is looked up among operators first, then enemies.
    pub fn operator_from_default(
        &self,
        details: &InitialOperatorDetails,
    ) -> Result<OperatorState, OperatorError> {
        let name = match details.name.trim() {
            "" => DEFAULT_OPERATOR_NAME,
            name => name,
        };

        let (faction, operator_id) = match self.resolve_name(name, Faction::Operator) {
            NameMatch::Found(id) => (Faction::Operator, id),
            NameMatch::Suggestions(_) => match self.resolve_name(name, Faction::Enemy) {
                NameMatch::Found(id) => (Faction::Enemy, id),
                NameMatch::Suggestions(_) => return Err(OperatorError::NoMatch(name.to_string())),
            },
        };
        let stance: Stance = details.stance.parse()?;
        let animations = if details.animations.is_empty() {
            vec![stance.default_animation().to_string()]
        } else {
            details.animations.clone()
        };

        let state = OperatorState {
            faction,
            operator_id,
            skin: details.skin.clone(),
            stance,
            facing: Facing::Front,
            animation_speed: self.config().default_animation_speed,
            start_pos: Some(Vector2::new(details.position_x, 0.0)),
            action: Some(Action::play(animations)),
            ..OperatorState::default()
        };
        self.normalize(state)
    }
}

/// `wanted` if every entry is available, else `[fallback]`, else the first
/// available animation.
fn valid_animations(available: &[String], wanted: Vec<String>, fallback: &str) -> Vec<String> {
    if !wanted.is_empty() && wanted.iter().all(|a| available.contains(a)) {
        return wanted;
    }
    match available.first() {
        Some(first) if !available.iter().any(|a| a == fallback) => vec![first.clone()],
        _ => vec![fallback.to_string()],
    }
}

fn valid_animation(available: &[String], wanted: String, fallback: &str) -> String {
    valid_animations(available, vec![wanted], fallback)
        .into_iter()
        .next()
        .unwrap_or_else(|| fallback.to_string())
}
