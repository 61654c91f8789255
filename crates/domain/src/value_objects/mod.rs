//! Value objects - Immutable objects defined by their attributes

mod rolling_window;
mod runtime_config;
mod vector;

pub use rolling_window::RollingWindow;
pub use runtime_config::{RuntimeConfig, RuntimeConfigPatch};
pub use vector::{clamp_f64, Vector2};
