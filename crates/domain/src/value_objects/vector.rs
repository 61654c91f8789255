use serde::{Deserialize, Serialize};
use std::fmt;

/// Clamp `value` into `[min, max]`. NaN maps to `min`.
///
/// Unlike `f64::clamp` this never panics; callers validate `min <= max`
/// when the bounds are loaded.
pub fn clamp_f64(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() || value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// A 2D vector. Positions use the unit square, scales and speeds use
/// multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Same value on both axes.
    pub const fn splat(value: f64) -> Self {
        Self { x: value, y: value }
    }

    /// Clamp both axes independently.
    pub fn clamped(self, min: f64, max: f64) -> Self {
        Self {
            x: clamp_f64(self.x, min, max),
            y: clamp_f64(self.y, min, max),
        }
    }

    /// Clamp both axes into the unit square.
    pub fn clamped_unit(self) -> Self {
        self.clamped(0.0, 1.0)
    }
}

impl fmt::Display for Vector2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_handles_both_sides() {
        assert_eq!(clamp_f64(-1.0, 0.0, 1.0), 0.0);
        assert_eq!(clamp_f64(2.0, 0.0, 1.0), 1.0);
        assert_eq!(clamp_f64(0.25, 0.0, 1.0), 0.25);
    }

    #[test]
    fn nan_clamps_to_the_lower_bound() {
        assert_eq!(clamp_f64(f64::NAN, 0.1, 5.0), 0.1);
        assert_eq!(
            Vector2::new(f64::NAN, 0.5).clamped_unit(),
            Vector2::new(0.0, 0.5)
        );
    }

    #[test]
    fn clamped_unit_clamps_axes_independently() {
        let v = Vector2::new(1.5, -0.5).clamped_unit();
        assert_eq!(v, Vector2::new(1.0, 0.0));
    }

    #[test]
    fn serializes_lowercase_axes() {
        let json = serde_json::to_value(Vector2::new(0.5, 0.0)).expect("serialize");
        assert_eq!(json, serde_json::json!({"x": 0.5, "y": 0.0}));
    }
}
