/// Streaming filters for geographic position estimates.
pub mod kalman_2d;

pub use kalman_2d::Kalman2D;
