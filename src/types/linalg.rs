//! Linear algebra type system for the field tracker
//!
//! Fixed-size nalgebra aliases with compile-time dimension checking for the
//! constant-velocity smoother and the affine calibration solve.

use nalgebra::{SMatrix, SVector};

// ===== State Dimensions =====
pub const STATE_DIM: usize = 4; // [lat, lon, v_lat, v_lon]
pub const MEASURE_DIM: usize = 2; // position only [lat, lon]

// ===== Smoother Types =====
pub type StateVec = SVector<f64, STATE_DIM>;
pub type StateMat = SMatrix<f64, STATE_DIM, STATE_DIM>;

pub type MeasureVec = SVector<f64, MEASURE_DIM>;
pub type MeasureMat = SMatrix<f64, MEASURE_DIM, MEASURE_DIM>;

// Measurement jacobian and Kalman gain
pub type MeasureJacobian = SMatrix<f64, MEASURE_DIM, STATE_DIM>; // 2×4
pub type KalmanGain = SMatrix<f64, STATE_DIM, MEASURE_DIM>; // 4×2

// ===== Affine Calibration Types =====
// Normal equations of the 2n×6 least-squares system; solved augmented.
pub const AFFINE_PARAMS: usize = 6;
pub type NormalMat = SMatrix<f64, AFFINE_PARAMS, AFFINE_PARAMS>;
pub type NormalVec = SVector<f64, AFFINE_PARAMS>;
pub type AugmentedMat = SMatrix<f64, AFFINE_PARAMS, 7>;
