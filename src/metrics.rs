//! Field-space error metrics.
//!
//! Pure functions over 2D field positions (yards). Marchers reason in
//! steps, not yards, so every distance has a step-converted twin; the
//! step size is a config value (0.75 yd = standard 8-to-5 stride).
//! Everything here is stateless and safe to call per rendered frame.

use serde::{Deserialize, Serialize};

use crate::types::FieldPoint;

/// Floor on step size so a zeroed config value cannot divide by zero.
const MIN_STEP_SIZE_YARDS: f64 = 0.0001;

/// Target-minus-current displacement split along the field axes.
/// Longitudinal runs along the 120-yard length (x), lateral across the
/// width (y).
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ErrorComponentsYards {
    pub lateral_yards: f64,
    pub longitudinal_yards: f64,
}

/// Same decomposition expressed in steps.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ErrorComponentsSteps {
    pub lateral_steps: f64,
    pub longitudinal_steps: f64,
}

/// Scalar distance to target in both units.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ErrorInSteps {
    pub yards: f64,
    pub steps: f64,
}

pub fn yards_to_steps(yards: f64, step_size_yards: f64) -> f64 {
    yards / step_size_yards.max(MIN_STEP_SIZE_YARDS)
}

pub fn steps_to_yards(steps: f64, step_size_yards: f64) -> f64 {
    steps * step_size_yards
}

pub fn distance_yards(a: FieldPoint, b: FieldPoint) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Unit vector from `from` toward `to`. A zero-length displacement keeps
/// the denominator at 1 and yields {0, 0} instead of NaN.
pub fn direction_vector(from: FieldPoint, to: FieldPoint) -> FieldPoint {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let mut len = dx.hypot(dy);
    if len == 0.0 {
        len = 1.0;
    }
    FieldPoint::new(dx / len, dy / len)
}

pub fn error_components_yards(current: FieldPoint, target: FieldPoint) -> ErrorComponentsYards {
    ErrorComponentsYards {
        lateral_yards: target.y - current.y,
        longitudinal_yards: target.x - current.x,
    }
}

pub fn error_in_steps(current: FieldPoint, target: FieldPoint, step_size_yards: f64) -> ErrorInSteps {
    let yards = distance_yards(current, target);
    ErrorInSteps {
        yards,
        steps: yards_to_steps(yards, step_size_yards),
    }
}

pub fn error_components_steps(
    current: FieldPoint,
    target: FieldPoint,
    step_size_yards: f64,
) -> ErrorComponentsSteps {
    let yards = error_components_yards(current, target);
    ErrorComponentsSteps {
        lateral_steps: yards_to_steps(yards.lateral_yards, step_size_yards),
        longitudinal_steps: yards_to_steps(yards.longitudinal_yards, step_size_yards),
    }
}

/// True iff the step distance to target strictly exceeds the threshold.
/// Exactly at the threshold still counts as on target.
pub fn is_off_target(
    current: FieldPoint,
    target: FieldPoint,
    step_size_yards: f64,
    threshold_steps: f64,
) -> bool {
    error_in_steps(current, target, step_size_yards).steps > threshold_steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_yards_steps_round_trip() {
        let yards = 3.0;
        let step = 0.75;
        let steps = yards_to_steps(yards, step);
        assert_relative_eq!(steps_to_yards(steps, step), yards, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_step_size_guard() {
        let steps = yards_to_steps(1.0, 0.0);
        assert!(steps.is_finite());
        assert_relative_eq!(steps, 1.0 / 0.0001);
    }

    #[test]
    fn test_distance_three_four_five() {
        let d = distance_yards(FieldPoint::new(0.0, 0.0), FieldPoint::new(3.0, 4.0));
        assert_eq!(d, 5.0);
    }

    #[test]
    fn test_direction_vector_is_unit() {
        let dir = direction_vector(FieldPoint::new(0.0, 0.0), FieldPoint::new(3.0, 4.0));
        assert_relative_eq!(dir.x, 0.6, epsilon = 1e-12);
        assert_relative_eq!(dir.y, 0.8, epsilon = 1e-12);
    }

    #[test]
    fn test_direction_vector_degenerate() {
        let p = FieldPoint::new(7.0, 7.0);
        let dir = direction_vector(p, p);
        assert_eq!(dir, FieldPoint::new(0.0, 0.0));
    }

    #[test]
    fn test_error_components_and_steps() {
        let current = FieldPoint::new(10.0, 10.0);
        let target = FieldPoint::new(11.0, 12.0);

        let comps = error_components_yards(current, target);
        assert_relative_eq!(comps.longitudinal_yards, 1.0);
        assert_relative_eq!(comps.lateral_yards, 2.0);

        let err = error_in_steps(current, target, 0.75);
        assert_relative_eq!(err.yards, 1.0_f64.hypot(2.0));
        assert_relative_eq!(err.steps, err.yards / 0.75);

        let step_comps = error_components_steps(current, target, 0.75);
        assert_relative_eq!(step_comps.longitudinal_steps, 1.0 / 0.75);
        assert_relative_eq!(step_comps.lateral_steps, 2.0 / 0.75);
    }

    #[test]
    fn test_off_target_boundary_is_strict() {
        let current = FieldPoint::new(0.0, 0.0);
        // 0.375 yd at 0.75 yd/step = exactly 0.5 steps: still on target.
        assert!(!is_off_target(current, FieldPoint::new(0.375, 0.0), 0.75, 0.5));
        // 0.5 yd = 0.666 steps: off target.
        assert!(is_off_target(current, FieldPoint::new(0.5, 0.0), 0.75, 0.5));
    }
}
