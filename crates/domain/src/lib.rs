//! Chibi Bot domain types.
//!
//! Everything in this crate is pure data plus the invariants that go with it.
//! Catalog lookups, clocks and randomness live behind ports in the engine.

pub mod chatter;
pub mod error;
pub mod operator;
pub mod value_objects;

pub use chatter::Chatter;
pub use error::DomainError;
pub use operator::{
    filter_animations, matches_keyword, move_animations, Action, ActionKind, Facing, Faction,
    OperatorState, Stance, DEFAULT_ANIM_BASE, DEFAULT_ANIM_BASE_RELAX, DEFAULT_ANIM_BATTLE,
    DEFAULT_MOVE_ANIM, DEFAULT_SKIN,
};
pub use value_objects::{
    clamp_f64, RollingWindow, RuntimeConfig, RuntimeConfigPatch, Vector2,
};
