//! Per-room rendering bounds.
//!
//! A room starts from `RuntimeConfig::default()` and may be replaced through
//! the admin path. Every replacement goes through [`RuntimeConfig::validate`]
//! before it is swapped in.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Default/min/max bounds for the numeric knobs a chatter can turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub default_animation_speed: f64,
    pub min_animation_speed: f64,
    pub max_animation_speed: f64,

    pub default_scale_size: f64,
    pub min_scale_size: f64,
    pub max_scale_size: f64,
    pub max_sprite_pixel_size: i64,

    pub reference_movement_speed_px: i64,
    pub default_movement_speed: f64,
    pub min_movement_speed: f64,
    pub max_movement_speed: f64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_animation_speed: 1.0,
            min_animation_speed: 0.1,
            max_animation_speed: 5.0,

            default_scale_size: 1.0,
            min_scale_size: 0.5,
            max_scale_size: 1.5,
            max_sprite_pixel_size: 350,

            reference_movement_speed_px: 80,
            default_movement_speed: 1.0,
            min_movement_speed: 0.1,
            max_movement_speed: 2.0,
        }
    }
}

impl RuntimeConfig {
    /// Check min <= default <= max for every bounded pair.
    pub fn validate(&self) -> Result<(), DomainError> {
        check_bounds(
            "animation_speed",
            self.min_animation_speed,
            self.default_animation_speed,
            self.max_animation_speed,
        )?;
        check_bounds(
            "scale_size",
            self.min_scale_size,
            self.default_scale_size,
            self.max_scale_size,
        )?;
        if self.max_sprite_pixel_size < 0 {
            return Err(DomainError::validation(
                "max_sprite_pixel_size must not be negative",
            ));
        }
        if self.reference_movement_speed_px <= 0 {
            return Err(DomainError::validation(
                "reference_movement_speed_px must be greater than 0",
            ));
        }
        check_bounds(
            "movement_speed",
            self.min_movement_speed,
            self.default_movement_speed,
            self.max_movement_speed,
        )
    }

    /// Apply the strictly positive fields of `patch` on top of `self`.
    ///
    /// The result is not validated; callers validate before swapping it in.
    pub fn merged_with(&self, patch: &RuntimeConfigPatch) -> Self {
        fn pick_f(current: f64, update: Option<f64>) -> f64 {
            match update {
                Some(v) if v > 0.0 => v,
                _ => current,
            }
        }
        fn pick_i(current: i64, update: Option<i64>) -> i64 {
            match update {
                Some(v) if v > 0 => v,
                _ => current,
            }
        }

        Self {
            default_animation_speed: pick_f(
                self.default_animation_speed,
                patch.default_animation_speed,
            ),
            min_animation_speed: pick_f(self.min_animation_speed, patch.min_animation_speed),
            max_animation_speed: pick_f(self.max_animation_speed, patch.max_animation_speed),
            default_scale_size: pick_f(self.default_scale_size, patch.default_scale_size),
            min_scale_size: pick_f(self.min_scale_size, patch.min_scale_size),
            max_scale_size: pick_f(self.max_scale_size, patch.max_scale_size),
            max_sprite_pixel_size: pick_i(self.max_sprite_pixel_size, patch.max_sprite_pixel_size),
            reference_movement_speed_px: pick_i(
                self.reference_movement_speed_px,
                patch.reference_movement_speed_px,
            ),
            default_movement_speed: pick_f(
                self.default_movement_speed,
                patch.default_movement_speed,
            ),
            min_movement_speed: pick_f(self.min_movement_speed, patch.min_movement_speed),
            max_movement_speed: pick_f(self.max_movement_speed, patch.max_movement_speed),
        }
    }
}

fn check_bounds(name: &str, min: f64, default: f64, max: f64) -> Result<(), DomainError> {
    if !(min.is_finite() && default.is_finite() && max.is_finite()) {
        return Err(DomainError::validation(format!(
            "{name} bounds must be finite numbers"
        )));
    }
    if min > max {
        return Err(DomainError::validation(format!(
            "min_{name} must be less than max_{name}"
        )));
    }
    if default < min || default > max {
        return Err(DomainError::validation(format!(
            "default_{name} must be between {min} and {max}"
        )));
    }
    Ok(())
}

/// Partial update for a room's [`RuntimeConfig`]. Absent and non-positive
/// fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfigPatch {
    pub default_animation_speed: Option<f64>,
    pub min_animation_speed: Option<f64>,
    pub max_animation_speed: Option<f64>,
    pub default_scale_size: Option<f64>,
    pub min_scale_size: Option<f64>,
    pub max_scale_size: Option<f64>,
    pub max_sprite_pixel_size: Option<i64>,
    pub reference_movement_speed_px: Option<i64>,
    pub default_movement_speed: Option<f64>,
    pub min_movement_speed: Option<f64>,
    pub max_movement_speed: Option<f64>,
}
