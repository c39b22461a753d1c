pub mod linalg;

pub use linalg::*;

use serde::{Deserialize, Serialize};

/// Football field length in yards (end line to end line, including end zones).
pub const FIELD_LENGTH_YARDS: f64 = 120.0;

/// Football field width in yards (53 1/3 yd).
pub const FIELD_WIDTH_YARDS: f64 = 53.34;

/// A geographic reading, raw or smoothed.
///
/// `t` is an epoch timestamp in milliseconds, matching what phone location
/// services report alongside a fix.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
    pub t: f64,
}

/// A raw fix from the platform location service. Accuracy (meters) is only
/// present when the device reports it.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct GpsFix {
    pub lat: f64,
    pub lon: f64,
    pub accuracy: Option<f64>,
    pub t: f64,
}

impl GpsFix {
    pub fn geo_point(&self) -> GeoPoint {
        GeoPoint {
            lat: self.lat,
            lon: self.lon,
            t: self.t,
        }
    }
}

/// A position on the field in yards: x runs along the 120-yard length,
/// y across the 53 1/3-yard width. Doubles as a plain 2D vector for the
/// metrics module (directions, displacements).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldPoint {
    pub x: f64,
    pub y: f64,
}

impl FieldPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Clamp into field bounds. The calibrator itself never clamps; this is
    /// for callers that need an on-field position to render or compare.
    pub fn clamp_to_field(&self) -> Self {
        Self {
            x: self.x.clamp(0.0, FIELD_LENGTH_YARDS),
            y: self.y.clamp(0.0, FIELD_WIDTH_YARDS),
        }
    }
}

/// Tracker configuration shared by the sampler, the smoother, and the
/// guidance engine. Loadable from JSON; unspecified fields take defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Output ticks per second for the sampling driver.
    pub hz: f64,
    /// Pass fixes through the Kalman smoother (false = raw pass-through).
    pub smoothing: bool,
    /// Kalman process noise q, squared degrees.
    pub process_noise: f64,
    /// Kalman measurement noise r, squared degrees. Higher = more
    /// smoothing, more lag.
    pub measurement_noise: f64,
    /// Marching step size in yards (0.75 = standard 8-to-5).
    pub step_size_yards: f64,
    /// Distance in steps beyond which the marcher counts as off target.
    pub off_target_threshold_steps: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            hz: 2.0,
            smoothing: true,
            process_noise: 1e-3,
            measurement_noise: 5e-2,
            step_size_yards: 0.75,
            off_target_threshold_steps: 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = TrackerConfig::default();
        assert_eq!(config.hz, 2.0);
        assert!(config.smoothing);
        assert_eq!(config.step_size_yards, 0.75);
    }

    #[test]
    fn test_config_partial_json() {
        let config: TrackerConfig = serde_json::from_str(r#"{"hz": 4.0, "smoothing": false}"#)
            .expect("partial config should deserialize");
        assert_eq!(config.hz, 4.0);
        assert!(!config.smoothing);
        assert_eq!(config.measurement_noise, 5e-2);
    }

    #[test]
    fn test_clamp_to_field() {
        let p = FieldPoint::new(-3.0, 60.0).clamp_to_field();
        assert_eq!(p.x, 0.0);
        assert_eq!(p.y, FIELD_WIDTH_YARDS);
    }
}
