//! Operator state and the vocabulary it is built from.

mod action;
mod animation;
mod kinds;
mod state;

pub use action::{Action, ActionKind};
pub use animation::{
    filter_animations, matches_keyword, move_animations, DEFAULT_ANIM_BASE,
    DEFAULT_ANIM_BASE_RELAX, DEFAULT_ANIM_BATTLE, DEFAULT_MOVE_ANIM, DEFAULT_SKIN,
};
pub use kinds::{Facing, Faction, Stance};
pub use state::OperatorState;
