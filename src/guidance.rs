//! Guidance engine: the pure computation layer downstream of the smoother.
//!
//! Independent of the async runtime and of how fixes arrive. It holds the
//! current calibration and the route's waypoints, and turns one smoothed
//! geographic estimate into one guidance signal for the HUD. Everything
//! temporal stays in the sampler; everything here is synchronous and
//! testable with plain values.

use serde::{Deserialize, Serialize};

use crate::calibration::{apply_affine, AffineTransform, Coordinates};
use crate::metrics;
use crate::types::{FieldPoint, GeoPoint, TrackerConfig};

/// One frame of guidance against the current waypoint.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct GuidanceSignal {
    /// Calibrated position, unclamped (off-field positions are meaningful
    /// feedback during practice).
    pub field_position: FieldPoint,
    pub target: FieldPoint,
    pub distance_yards: f64,
    pub distance_steps: f64,
    /// Unit vector from current position toward the target; {0,0} when
    /// standing on it.
    pub direction: FieldPoint,
    pub lateral_steps: f64,
    pub longitudinal_steps: f64,
    pub off_target: bool,
}

pub struct GuidanceEngine {
    calibration: Option<AffineTransform>,
    waypoints: Vec<FieldPoint>,
    current_index: usize,
    step_size_yards: f64,
    off_target_threshold_steps: f64,
}

impl GuidanceEngine {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            calibration: None,
            waypoints: Vec::new(),
            current_index: 0,
            step_size_yards: config.step_size_yards,
            off_target_threshold_steps: config.off_target_threshold_steps,
        }
    }

    /// Install a freshly solved transform, replacing any prior one.
    pub fn set_calibration(&mut self, transform: AffineTransform) {
        self.calibration = Some(transform);
    }

    /// Drop calibration, e.g. when the operator moves to another field.
    pub fn clear_calibration(&mut self) {
        self.calibration = None;
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibration.is_some()
    }

    /// Replace the route. Resets progress to the first waypoint.
    pub fn set_waypoints(&mut self, waypoints: Vec<FieldPoint>) {
        self.waypoints = waypoints;
        self.current_index = 0;
    }

    pub fn current_waypoint(&self) -> Option<FieldPoint> {
        self.waypoints.get(self.current_index).copied()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Move to the next waypoint, clamping at the last one. An empty route
    /// stays at index 0.
    pub fn advance_waypoint(&mut self) -> usize {
        if !self.waypoints.is_empty() {
            self.current_index = (self.current_index + 1).min(self.waypoints.len() - 1);
        }
        self.current_index
    }

    /// Map a smoothed estimate into field space and score it against the
    /// current waypoint. None until calibrated and a route is loaded.
    pub fn evaluate(&self, geo: GeoPoint) -> Option<GuidanceSignal> {
        let transform = self.calibration.as_ref()?;
        let target = self.current_waypoint()?;

        let field_position = apply_affine(
            transform,
            Coordinates {
                lat: geo.lat,
                lon: geo.lon,
            },
        );

        let err = metrics::error_in_steps(field_position, target, self.step_size_yards);
        let comps = metrics::error_components_steps(field_position, target, self.step_size_yards);

        Some(GuidanceSignal {
            field_position,
            target,
            distance_yards: err.yards,
            distance_steps: err.steps,
            direction: metrics::direction_vector(field_position, target),
            lateral_steps: comps.lateral_steps,
            longitudinal_steps: comps.longitudinal_steps,
            off_target: err.steps > self.off_target_threshold_steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::solve_affine;
    use approx::assert_relative_eq;

    /// Field corners mapped to a unit geo square: lon carries x, lat
    /// carries y.
    fn unit_square_transform() -> AffineTransform {
        let geo = [
            Coordinates { lat: 0.0, lon: 0.0 },
            Coordinates { lat: 0.0, lon: 1.0 },
            Coordinates { lat: 1.0, lon: 0.0 },
        ];
        let field = [
            FieldPoint::new(0.0, 0.0),
            FieldPoint::new(120.0, 0.0),
            FieldPoint::new(0.0, 53.34),
        ];
        solve_affine(&geo, &field).expect("corner marks solve")
    }

    fn engine_with_route(waypoints: Vec<FieldPoint>) -> GuidanceEngine {
        let mut engine = GuidanceEngine::new(&TrackerConfig::default());
        engine.set_calibration(unit_square_transform());
        engine.set_waypoints(waypoints);
        engine
    }

    #[test]
    fn test_evaluate_requires_calibration_and_route() {
        let mut engine = GuidanceEngine::new(&TrackerConfig::default());
        let geo = GeoPoint { lat: 0.5, lon: 0.5, t: 0.0 };
        assert!(engine.evaluate(geo).is_none());

        engine.set_calibration(unit_square_transform());
        assert!(engine.evaluate(geo).is_none(), "still no route");

        engine.set_waypoints(vec![FieldPoint::new(60.0, 26.67)]);
        assert!(engine.evaluate(geo).is_some());
    }

    #[test]
    fn test_evaluate_scores_against_current_waypoint() {
        let engine = engine_with_route(vec![FieldPoint::new(61.0, 28.67)]);

        // Geo midpoint of the square maps to (60, 26.67).
        let signal = engine
            .evaluate(GeoPoint { lat: 0.5, lon: 0.5, t: 0.0 })
            .expect("calibrated with route");

        assert_relative_eq!(signal.field_position.x, 60.0, epsilon = 1e-9);
        assert_relative_eq!(signal.field_position.y, 26.67, epsilon = 1e-9);
        assert_relative_eq!(signal.distance_yards, 1.0_f64.hypot(2.0), epsilon = 1e-9);
        assert_relative_eq!(signal.longitudinal_steps, 1.0 / 0.75, epsilon = 1e-9);
        assert_relative_eq!(signal.lateral_steps, 2.0 / 0.75, epsilon = 1e-9);
        assert!(signal.off_target);

        // Standing on the mark: zero error, on target, null direction.
        let on_mark = engine
            .evaluate(GeoPoint { lat: 28.67 / 53.34, lon: 61.0 / 120.0, t: 0.0 })
            .expect("on mark");
        assert!(on_mark.distance_yards < 1e-9);
        assert!(!on_mark.off_target);
    }

    #[test]
    fn test_advance_waypoint_clamps_at_end() {
        let mut engine = engine_with_route(vec![
            FieldPoint::new(10.0, 10.0),
            FieldPoint::new(20.0, 20.0),
        ]);
        assert_eq!(engine.current_index(), 0);
        assert_eq!(engine.advance_waypoint(), 1);
        assert_eq!(engine.advance_waypoint(), 1, "clamped at last waypoint");
        assert_eq!(engine.current_waypoint(), Some(FieldPoint::new(20.0, 20.0)));
    }

    #[test]
    fn test_advance_on_empty_route_stays_at_zero() {
        let mut engine = GuidanceEngine::new(&TrackerConfig::default());
        assert_eq!(engine.advance_waypoint(), 0);
    }
}
