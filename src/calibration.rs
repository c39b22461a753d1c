//! Affine calibration between geographic degrees and field yards.
//!
//! A practice field is small enough that geo -> field is an affine map to
//! within GPS noise: 6 parameters, solved in least squares from the
//! correspondence pairs an operator collects by standing on known field
//! marks while a live fix is up. Three non-degenerate pairs determine the
//! map exactly; more pairs average the noise down and `rms_error` reports
//! how consistent the set was.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{AugmentedMat, FieldPoint, NormalMat, NormalVec, AFFINE_PARAMS};

/// Pivot magnitude below which the normal-equations solve is treated as
/// degenerate (collinear marks, duplicate points).
const PIVOT_EPSILON: f64 = 1e-12;

/// Minimum correspondence pairs for a well-determined 6-parameter solve.
pub const MIN_PAIRS: usize = 3;

/// A geographic coordinate without a timestamp, the geo side of a
/// correspondence pair.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Row-major 2x3 affine map:
/// x = m[0]*lat + m[1]*lon + m[2]
/// y = m[3]*lat + m[4]*lon + m[5]
///
/// Immutable once solved; recalibration produces a fresh transform.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    pub m: [f64; 6],
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalibrationError {
    #[error("need at least {MIN_PAIRS} correspondence pairs, got {got}")]
    InsufficientPairs { got: usize },

    #[error("correspondence arrays differ in length: {geo} geo vs {field} field")]
    LengthMismatch { geo: usize, field: usize },

    #[error("correspondence points are collinear or duplicated; system is degenerate")]
    DegenerateSystem,
}

/// Solve the best-fit geo -> field affine transform from correspondence
/// pairs.
///
/// Builds the 2n x 6 least-squares system (one x row and one y row per
/// pair), accumulates the normal equations (A^T A) p = A^T b, and reduces
/// the 6x6 by Gauss-Jordan elimination without pivoting. A pivot smaller
/// than `PIVOT_EPSILON` means the marks do not span the field plane and the
/// solve fails rather than returning a garbage transform.
pub fn solve_affine(
    geo: &[Coordinates],
    field: &[FieldPoint],
) -> Result<AffineTransform, CalibrationError> {
    if geo.len() != field.len() {
        return Err(CalibrationError::LengthMismatch {
            geo: geo.len(),
            field: field.len(),
        });
    }
    if geo.len() < MIN_PAIRS {
        return Err(CalibrationError::InsufficientPairs { got: geo.len() });
    }

    // Accumulate A^T A and A^T b directly. Per pair the design rows are
    //   x: [lat, lon, 1, 0,   0,   0]
    //   y: [0,   0,   0, lat, lon, 1]
    // so the normal matrix is block diagonal with two identical 3x3 blocks.
    let mut ata = NormalMat::zeros();
    let mut atb = NormalVec::zeros();
    for (g, f) in geo.iter().zip(field.iter()) {
        let row = [g.lat, g.lon, 1.0];
        for r in 0..3 {
            for c in 0..3 {
                let prod = row[r] * row[c];
                ata[(r, c)] += prod;
                ata[(r + 3, c + 3)] += prod;
            }
            atb[r] += row[r] * f.x;
            atb[r + 3] += row[r] * f.y;
        }
    }

    let p = solve_normal_equations(&ata, &atb).ok_or(CalibrationError::DegenerateSystem)?;
    Ok(AffineTransform {
        m: [p[0], p[1], p[2], p[3], p[4], p[5]],
    })
}

/// Map a geographic coordinate through a solved transform. O(1), cannot
/// fail; out-of-bounds results are the caller's concern (clamp_to_field).
pub fn apply_affine(transform: &AffineTransform, geo: Coordinates) -> FieldPoint {
    let [a, b, tx, c, d, ty] = transform.m;
    FieldPoint {
        x: a * geo.lat + b * geo.lon + tx,
        y: c * geo.lat + d * geo.lon + ty,
    }
}

/// Root-mean-square Euclidean residual of the transform over a sample set,
/// in yards. Reported to the operator as calibration quality; ~0 for a
/// perfectly consistent set.
pub fn rms_error(transform: &AffineTransform, geo: &[Coordinates], field: &[FieldPoint]) -> f64 {
    let mut sum = 0.0;
    for (g, f) in geo.iter().zip(field.iter()) {
        let mapped = apply_affine(transform, *g);
        let dx = mapped.x - f.x;
        let dy = mapped.y - f.y;
        sum += dx * dx + dy * dy;
    }
    (sum / geo.len().max(1) as f64).sqrt()
}

/// Gauss-Jordan on the augmented [A^T A | A^T b], no pivoting. For this
/// 6x6 the naive reduction is exact enough, and the tiny-pivot check is
/// the degeneracy signal callers rely on.
fn solve_normal_equations(ata: &NormalMat, atb: &NormalVec) -> Option<NormalVec> {
    let mut m = AugmentedMat::zeros();
    for r in 0..AFFINE_PARAMS {
        for c in 0..AFFINE_PARAMS {
            m[(r, c)] = ata[(r, c)];
        }
        m[(r, AFFINE_PARAMS)] = atb[r];
    }

    for col in 0..AFFINE_PARAMS {
        let pivot = m[(col, col)];
        if pivot.abs() < PIVOT_EPSILON {
            return None;
        }
        for j in col..=AFFINE_PARAMS {
            m[(col, j)] /= pivot;
        }
        for i in 0..AFFINE_PARAMS {
            if i == col {
                continue;
            }
            let factor = m[(i, col)];
            for j in col..=AFFINE_PARAMS {
                m[(i, j)] -= factor * m[(col, j)];
            }
        }
    }

    let mut p = NormalVec::zeros();
    for r in 0..AFFINE_PARAMS {
        p[r] = m[(r, AFFINE_PARAMS)];
    }
    Some(p)
}

/// Ordered correspondence pairs collected during a calibration session.
/// Appended one pair at a time as the operator clicks a field mark while a
/// live reading exists; discarded after calibration completes or is
/// cancelled.
#[derive(Clone, Debug, Default)]
pub struct CorrespondenceSet {
    geo: Vec<Coordinates>,
    field: Vec<FieldPoint>,
}

impl CorrespondenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, geo: Coordinates, field: FieldPoint) {
        self.geo.push(geo);
        self.field.push(field);
    }

    pub fn len(&self) -> usize {
        self.geo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geo.is_empty()
    }

    pub fn is_ready(&self) -> bool {
        self.geo.len() >= MIN_PAIRS
    }

    pub fn clear(&mut self) {
        self.geo.clear();
        self.field.clear();
    }

    pub fn solve(&self) -> Result<AffineTransform, CalibrationError> {
        solve_affine(&self.geo, &self.field)
    }

    /// Solve and report RMS quality in one pass.
    pub fn solve_with_quality(&self) -> Result<(AffineTransform, f64), CalibrationError> {
        let transform = self.solve()?;
        let rms = rms_error(&transform, &self.geo, &self.field);
        Ok((transform, rms))
    }
}
