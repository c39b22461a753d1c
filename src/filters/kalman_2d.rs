//! Constant-velocity 2D Kalman smoother over geographic coordinates.
//!
//! State vector (4D):
//! [0-1]: Position (lat, lon) in degrees
//! [2-3]: Velocity (v_lat, v_lon) in degrees/second
//!
//! Phone GPS fixes arrive at irregular intervals with jitter on the order
//! of meters; this filter trades a little lag for a stable estimate the
//! field view can render without shaking. Only position is observed, so H
//! is 2x4 and the innovation covariance stays a 2x2 we invert by the
//! determinant formula.

use crate::types::{
    GeoPoint, KalmanGain, MeasureJacobian, MeasureMat, MeasureVec, StateMat, StateVec,
};

/// Default process noise q, squared degrees.
pub const DEFAULT_PROCESS_NOISE: f64 = 1e-3;

/// Default measurement noise r, squared degrees. Higher r = smoother
/// output, more lag.
pub const DEFAULT_MEASUREMENT_NOISE: f64 = 5e-2;

/// dt floor in seconds. Fixes carrying the same (or a rewound) timestamp
/// must not zero out the transition.
const MIN_DT_SECS: f64 = 0.001;

pub struct Kalman2D {
    /// State [lat, lon, v_lat, v_lon]
    x: StateVec,

    /// Covariance, symmetric positive semi-definite through every update
    p: StateMat,

    /// Timestamp (epoch ms) of the previous observation, None before init
    last_t: Option<f64>,

    /// Process noise q [deg²]
    q: f64,

    /// Measurement noise r [deg²]
    r: f64,

    /// Observations consumed, including the initializing one
    update_count: u64,
}

impl Kalman2D {
    pub fn new(process_noise: f64, measurement_noise: f64) -> Self {
        Self {
            x: StateVec::zeros(),
            p: StateMat::identity(),
            last_t: None,
            q: process_noise,
            r: measurement_noise,
            update_count: 0,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.last_t.is_some()
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// Seed the filter at an observation: zero velocity, identity
    /// covariance. Returns the current estimate (an echo of the input).
    pub fn init(&mut self, obs: GeoPoint) -> GeoPoint {
        self.x = StateVec::new(obs.lat, obs.lon, 0.0, 0.0);
        self.p = StateMat::identity();
        self.last_t = Some(obs.t);
        self.update_count += 1;
        self.estimate()
    }

    /// Fold one observation into the state. Auto-initializes on the first
    /// call so callers never have to track filter lifecycle themselves.
    ///
    /// Non-finite inputs are not defended here; the sampler validates fixes
    /// before they reach the filter.
    pub fn update(&mut self, obs: GeoPoint) -> GeoPoint {
        let last_t = match self.last_t {
            Some(t) => t,
            None => return self.init(obs),
        };

        let dt = ((obs.t - last_t) / 1000.0).max(MIN_DT_SECS);
        self.predict(dt);
        self.correct(obs.lat, obs.lon);
        self.last_t = Some(obs.t);
        self.update_count += 1;
        self.estimate()
    }

    /// Current estimate. `t` is the timestamp of the last observation
    /// folded in (0 before init).
    pub fn estimate(&self) -> GeoPoint {
        GeoPoint {
            lat: self.x[0],
            lon: self.x[1],
            t: self.last_t.unwrap_or(0.0),
        }
    }

    /// Covariance trace, a scalar uncertainty proxy for status display.
    pub fn covariance_trace(&self) -> f64 {
        self.p.trace()
    }

    /// Predict step: constant-velocity transition, P = F P F^T + Q with
    /// process noise on the diagonal only.
    fn predict(&mut self, dt: f64) {
        self.x[0] += dt * self.x[2];
        self.x[1] += dt * self.x[3];
        // velocities carry over unchanged

        let mut f = StateMat::identity();
        f[(0, 2)] = dt;
        f[(1, 3)] = dt;

        self.p = f * self.p * f.transpose() + StateMat::identity() * self.q;
    }

    /// Measurement update observing [lat, lon] only.
    fn correct(&mut self, z_lat: f64, z_lon: f64) {
        let mut h = MeasureJacobian::zeros();
        h[(0, 0)] = 1.0;
        h[(1, 1)] = 1.0;

        // Innovation y = z - Hx
        let y = MeasureVec::new(z_lat - self.x[0], z_lon - self.x[1]);

        // S = H P H^T + r I, inverted by the 2x2 determinant formula.
        // Near-singular S gets an epsilon determinant instead of an error;
        // the resulting gain is garbage for one tick but the stream keeps
        // flowing.
        let s00 = self.p[(0, 0)] + self.r;
        let s01 = self.p[(0, 1)];
        let s10 = self.p[(1, 0)];
        let s11 = self.p[(1, 1)] + self.r;

        let mut det = s00 * s11 - s01 * s10;
        if det.abs() < 1e-12 {
            det = 1e-6;
        }
        let s_inv = MeasureMat::new(s11 / det, -s01 / det, -s10 / det, s00 / det);

        // K = P H^T S^-1 (4x2)
        let k: KalmanGain = self.p * h.transpose() * s_inv;

        self.x += k * y;
        self.p = (StateMat::identity() - k * h) * self.p;
    }
}

impl Default for Kalman2D {
    fn default() -> Self {
        Self::new(DEFAULT_PROCESS_NOISE, DEFAULT_MEASUREMENT_NOISE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic LCG so the jitter test is reproducible.
    struct Lcg(u64);

    impl Lcg {
        fn next_f64(&mut self) -> f64 {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (self.0 >> 11) as f64 / (1u64 << 53) as f64
        }

        /// Uniform in [-amplitude/2, amplitude/2]
        fn noise(&mut self, amplitude: f64) -> f64 {
            (self.next_f64() - 0.5) * amplitude
        }
    }

    fn rms(values: &[f64]) -> f64 {
        let mean_sq = values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64;
        mean_sq.sqrt()
    }

    #[test]
    fn test_init_echoes_observation() {
        let mut kf = Kalman2D::default();
        let est = kf.init(GeoPoint { lat: 40.0, lon: -75.0, t: 1000.0 });
        assert_eq!(est.lat, 40.0);
        assert_eq!(est.lon, -75.0);
        assert_eq!(est.t, 1000.0);
        assert!(kf.is_initialized());
    }

    #[test]
    fn test_update_auto_initializes() {
        let mut kf = Kalman2D::default();
        let est = kf.update(GeoPoint { lat: 1.0, lon: 2.0, t: 500.0 });
        assert_eq!(est.lat, 1.0);
        assert_eq!(est.lon, 2.0);
        assert_eq!(kf.update_count(), 1);
    }

    #[test]
    fn test_smooths_without_teleporting() {
        // One step from (0,0) toward an observation must land strictly
        // between prior state and observation for any r > 0.
        let mut kf = Kalman2D::default();
        kf.init(GeoPoint { lat: 0.0, lon: 0.0, t: 0.0 });
        let est = kf.update(GeoPoint { lat: 0.0001, lon: 0.0001, t: 500.0 });

        assert!(est.lat > 0.0 && est.lat < 0.0001);
        assert!(est.lon > 0.0 && est.lon < 0.0001);
    }

    #[test]
    fn test_reduces_rms_jitter_on_straight_path() {
        let mut kf = Kalman2D::new(1e-3, 5e-2);
        kf.init(GeoPoint { lat: 0.0, lon: 0.0, t: 0.0 });

        let mut rng = Lcg(0x5eed_cafe);
        let mut raw_errors = Vec::new();
        let mut filtered_errors = Vec::new();

        for i in 1..=100 {
            let t = i as f64 * 500.0; // 2 Hz
            let true_lat = i as f64 * 0.0001;
            let true_lon = i as f64 * 0.0001;
            let noise_lat = rng.noise(0.0004);
            let noise_lon = rng.noise(0.0004);

            let est = kf.update(GeoPoint {
                lat: true_lat + noise_lat,
                lon: true_lon + noise_lon,
                t,
            });

            raw_errors.push(noise_lat.hypot(noise_lon));
            filtered_errors.push((est.lat - true_lat).hypot(est.lon - true_lon));
        }

        let raw_rms = rms(&raw_errors);
        let filtered_rms = rms(&filtered_errors);
        assert!(
            filtered_rms < raw_rms * 0.8,
            "expected >=20% reduction: raw {raw_rms}, filtered {filtered_rms}"
        );
    }

    #[test]
    fn test_covariance_stays_symmetric_positive() {
        let mut kf = Kalman2D::default();
        kf.init(GeoPoint { lat: 10.0, lon: 20.0, t: 0.0 });

        for i in 1..=50 {
            kf.update(GeoPoint {
                lat: 10.0 + i as f64 * 1e-5,
                lon: 20.0 - i as f64 * 1e-5,
                t: i as f64 * 500.0,
            });
            for row in 0..4 {
                assert!(kf.p[(row, row)] > 0.0, "diagonal must stay positive");
                for col in 0..4 {
                    let asym = (kf.p[(row, col)] - kf.p[(col, row)]).abs();
                    assert!(asym < 1e-9, "covariance must stay symmetric");
                }
            }
        }
    }

    #[test]
    fn test_zero_dt_floor() {
        // Two fixes with the same timestamp must not blow up the predict.
        let mut kf = Kalman2D::default();
        kf.init(GeoPoint { lat: 5.0, lon: 5.0, t: 1000.0 });
        let est = kf.update(GeoPoint { lat: 5.001, lon: 5.001, t: 1000.0 });
        assert!(est.lat.is_finite() && est.lon.is_finite());
        assert!(est.lat > 5.0 && est.lat < 5.001);
    }
}
