// field_tracker_rs: field-relative GPS guidance core for marching band
// practice.
//
// Pipeline: raw fix -> sampler (latest-fix slot, fixed-rate tick) ->
// Kalman smoother -> smoothed geographic estimate -> affine calibration ->
// field position (yards) -> error metrics against the target waypoint ->
// guidance signal (distance, direction, off-target).
//
// The numeric modules (filters, calibration, metrics, guidance) are pure
// synchronous computation, testable with plain values; the sampler is the
// only component with a temporal dimension.

pub mod calibration;
pub mod filters;
pub mod guidance;
pub mod metrics;
pub mod sampler;
pub mod snapshot;
pub mod types;

pub use calibration::{
    apply_affine, rms_error, solve_affine, AffineTransform, CalibrationError, Coordinates,
    CorrespondenceSet,
};
pub use filters::Kalman2D;
pub use guidance::{GuidanceEngine, GuidanceSignal};
pub use sampler::{FixSender, GpsSampler, SmoothedTick};
pub use snapshot::{AccuracyTracker, TrackingSnapshot};
pub use types::{FieldPoint, GeoPoint, GpsFix, TrackerConfig};
