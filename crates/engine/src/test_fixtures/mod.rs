//! Test fixtures loader for JSON fixture files and common test helpers.
//!
//! Fixtures live in the crate's `test_data/` directory.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_fixtures::{fake_catalog, operator_service};
//!
//! #[test]
//! fn amiya_is_known() {
//!     let service = operator_service();
//!     // ... test logic
//! }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use chibibot_domain::{Action, Facing, Faction, OperatorState, RuntimeConfig, Stance};

use crate::infrastructure::catalog::AssetCatalog;
use crate::infrastructure::clock::FixedRandom;
use crate::use_cases::operator_state::OperatorStateService;

pub const AMIYA: &str = "char_002_amiya";
pub const LAVA: &str = "char_1011_lava2";
pub const SLUG: &str = "enemy_1007_slime_2";

/// Read a fixture file from `test_data/`.
///
/// # Panics
///
/// Panics if the fixture file cannot be read.
pub fn read_fixture(path: &str) -> String {
    let fixture_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_data")
        .join(path);
    std::fs::read_to_string(&fixture_path).unwrap_or_else(|e| {
        panic!(
            "Failed to read fixture '{}': {}",
            fixture_path.display(),
            e
        )
    })
}

/// Catalog with Amiya (base Front only, battle Front/Back, plus a base-only
/// skin), a battle-only operator, and two enemies.
pub fn fake_catalog() -> AssetCatalog {
    AssetCatalog::from_json(&read_fixture("catalog.json"))
        .unwrap_or_else(|e| panic!("Failed to parse catalog fixture: {e}"))
}

/// Service over the fake catalog with default bounds. Random picks always
/// take the first operator (Amiya).
pub fn operator_service() -> OperatorStateService {
    operator_service_with(RuntimeConfig::default())
}

pub fn operator_service_with(config: RuntimeConfig) -> OperatorStateService {
    OperatorStateService::new(Arc::new(fake_catalog()), Arc::new(FixedRandom(0)), config)
        .unwrap_or_else(|e| panic!("Invalid test config: {e}"))
}

/// Normalized Amiya in base stance playing `Relax`.
pub fn amiya_base() -> OperatorState {
    let mut state = OperatorState::request(AMIYA, Faction::Operator);
    state.skin = "default".into();
    state.stance = Stance::Base;
    state.facing = Facing::Front;
    state.set_action(Action::play_one("Relax"));
    operator_service()
        .normalize(state)
        .unwrap_or_else(|e| panic!("Failed to normalize fixture: {e}"))
}

/// Normalized Amiya in battle stance.
pub fn amiya_battle() -> OperatorState {
    let mut state = amiya_base();
    state.stance = Stance::Battle;
    state.set_action(Action::play_one("Idle"));
    operator_service()
        .normalize(state)
        .unwrap_or_else(|e| panic!("Failed to normalize fixture: {e}"))
}

/// Normalized slug enemy.
pub fn slug() -> OperatorState {
    let state = OperatorState::request(SLUG, Faction::Enemy);
    operator_service()
        .normalize(state)
        .unwrap_or_else(|e| panic!("Failed to normalize fixture: {e}"))
}
