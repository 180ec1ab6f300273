//! Movement helpers in normalized room space

use serde::{Deserialize, Serialize};

/// A point in the normalized `[0, 1] x [0, 1]` room
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Build a position, clamping both axes into the room
    pub fn clamped(x: f64, y: f64) -> Self {
        Self {
            x: clamp_normalized(x),
            y: clamp_normalized(y),
        }
    }
}

/// Clamp into `[0, 1]`; NaN collapses to 0
pub fn clamp_normalized(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Linear interpolation from `current` toward `target`
pub fn lerp(current: f64, target: f64, smoothing: f64) -> f64 {
    current + (target - current) * smoothing
}

/// Move toward `target` by at most `max_delta`, landing exactly on it when close
pub fn approach(current: f64, target: f64, max_delta: f64) -> f64 {
    if (target - current).abs() <= max_delta {
        return target;
    }
    current + (target - current).signum() * max_delta
}
