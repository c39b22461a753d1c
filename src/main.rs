use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, Duration, Instant};

use field_tracker_rs::calibration::Coordinates;
use field_tracker_rs::snapshot::current_timestamp;
use field_tracker_rs::{
    AccuracyTracker, CorrespondenceSet, FieldPoint, GeoPoint, GpsFix, GpsSampler, GuidanceEngine,
    TrackerConfig, TrackingSnapshot,
};

/// Meters per degree of latitude (spherical approximation).
const METERS_PER_DEG_LAT: f64 = 111_320.0;
const METERS_PER_YARD: f64 = 0.9144;

#[derive(Parser, Debug)]
#[command(name = "field_tracker")]
#[command(about = "Field tracker demo - simulated marcher with GPS smoothing and guidance", long_about = None)]
struct Args {
    /// Duration in seconds
    #[arg(value_name = "SECONDS", default_value = "20")]
    duration: u64,

    /// Config file (JSON, partial overrides allowed)
    #[arg(long)]
    config: Option<String>,

    /// Disable Kalman smoothing (raw pass-through)
    #[arg(long)]
    raw: bool,

    /// Simulated marcher speed in yards/second
    #[arg(long, default_value = "2.0")]
    speed: f64,

    /// Output directory for the final tracking snapshot
    #[arg(long, default_value = "field_tracker_sessions")]
    output_dir: String,
}

/// Maps simulated field positions to geographic coordinates around an
/// arbitrary anchor, the inverse of what calibration recovers.
struct FieldGeoModel {
    origin_lat: f64,
    origin_lon: f64,
    deg_lat_per_yard: f64,
    deg_lon_per_yard: f64,
}

impl FieldGeoModel {
    fn new(origin_lat: f64, origin_lon: f64) -> Self {
        let deg_lat_per_yard = METERS_PER_YARD / METERS_PER_DEG_LAT;
        let deg_lon_per_yard =
            METERS_PER_YARD / (METERS_PER_DEG_LAT * origin_lat.to_radians().cos());
        Self {
            origin_lat,
            origin_lon,
            deg_lat_per_yard,
            deg_lon_per_yard,
        }
    }

    fn geo_for(&self, field: FieldPoint) -> Coordinates {
        Coordinates {
            lat: self.origin_lat + field.y * self.deg_lat_per_yard,
            lon: self.origin_lon + field.x * self.deg_lon_per_yard,
        }
    }
}

/// Deterministic GPS jitter, a couple of incommensurate sinusoids. Enough
/// to exercise the smoother without an RNG dependency.
fn jitter(seq: u64, phase: f64) -> f64 {
    ((seq as f64 * 0.7 + phase).sin() + (seq as f64 * 1.3 + phase * 2.0).sin()) * 1.5e-5
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            serde_json::from_str::<TrackerConfig>(&raw)?
        }
        None => TrackerConfig::default(),
    };
    if args.raw {
        config.smoothing = false;
    }

    println!("[{}] Field Tracker Starting", ts_now());
    println!("  Duration: {} seconds", args.duration);
    println!("  Tick rate: {} Hz", config.hz);
    println!("  Smoothing: {}", config.smoothing);
    println!("  Output Dir: {}", args.output_dir);

    std::fs::create_dir_all(&args.output_dir)?;

    // Field anchored at an arbitrary location; the model plays the role of
    // physical reality that calibration has to recover.
    let model = FieldGeoModel::new(40.0, -75.0);

    // Calibration pass: operator stands on three corners and the 50 yard
    // line while a live fix is up.
    let mut marks = CorrespondenceSet::new();
    for corner in [
        FieldPoint::new(0.0, 0.0),
        FieldPoint::new(120.0, 0.0),
        FieldPoint::new(0.0, 53.34),
        FieldPoint::new(60.0, 26.67),
    ] {
        marks.push(model.geo_for(corner), corner);
    }
    let (transform, rms) = marks.solve_with_quality()?;
    println!("[{}] Calibrated from {} marks, RMS {:.4} yd", ts_now(), marks.len(), rms);

    // Straight drill: down the 25-yard hash from the 20 to the 60.
    let route = vec![
        FieldPoint::new(20.0, 25.0),
        FieldPoint::new(40.0, 25.0),
        FieldPoint::new(60.0, 25.0),
    ];
    let mut engine = GuidanceEngine::new(&config);
    engine.set_calibration(transform);
    engine.set_waypoints(route);

    let (mut sampler, mut ticks) = GpsSampler::spawn(config.clone());

    // Simulated marcher: walks the drill path, fixes arrive at an uneven
    // ~1 Hz with deterministic jitter.
    let fixes_sent = Arc::new(AtomicU64::new(0));
    let fix_task = {
        let model = FieldGeoModel::new(40.0, -75.0);
        let speed = args.speed;
        let fix_tx = sampler.fix_sender();
        let fixes_sent = Arc::clone(&fixes_sent);
        tokio::spawn(async move {
            let mut seq = 0u64;
            let start = Instant::now();
            loop {
                let elapsed = start.elapsed().as_secs_f64();
                let truth = FieldPoint::new(20.0 + speed * elapsed, 25.0);
                let geo = model.geo_for(truth);
                let fix = GpsFix {
                    lat: geo.lat + jitter(seq, 0.0),
                    lon: geo.lon + jitter(seq, 1.0),
                    accuracy: Some(4.0 + (seq as f64 * 0.4).sin().abs() * 3.0),
                    t: current_timestamp() * 1000.0,
                };
                if !fix_tx.push(fix) {
                    break;
                }
                fixes_sent.fetch_add(1, Ordering::Relaxed);
                seq += 1;
                // Irregular arrival: 0.7s / 1.0s / 1.3s pattern
                let gap_ms = 700 + (seq % 3) * 300;
                sleep(Duration::from_millis(gap_ms)).await;
            }
        })
    };

    let mut accuracy = AccuracyTracker::new();
    let mut snapshot = TrackingSnapshot::new();
    snapshot.is_tracking = true;
    snapshot.calibrated = true;
    snapshot.calibration_rms = Some(rms);

    let deadline = Instant::now() + Duration::from_secs(args.duration);
    loop {
        let tick = tokio::select! {
            tick = ticks.recv() => match tick {
                Some(tick) => tick,
                None => break,
            },
            _ = tokio::time::sleep_until(deadline) => break,
        };

        snapshot.ticks_emitted += 1;
        if let Some(acc) = tick.accuracy {
            accuracy.push(acc);
        }

        let geo = GeoPoint {
            lat: tick.lat,
            lon: tick.lon,
            t: tick.t,
        };
        if let Some(signal) = engine.evaluate(geo) {
            println!(
                "[{}] pos ({:6.2}, {:5.2}) yd | target ({:5.1}, {:4.1}) | {:5.2} steps {} | dir ({:+.2}, {:+.2})",
                ts_now(),
                signal.field_position.x,
                signal.field_position.y,
                signal.target.x,
                signal.target.y,
                signal.distance_steps,
                if signal.off_target { "OFF " } else { "on  " },
                signal.direction.x,
                signal.direction.y,
            );
            if !signal.off_target {
                let before = engine.current_index();
                let idx = engine.advance_waypoint();
                if idx != before {
                    println!("[{}] waypoint reached, advancing to #{}", ts_now(), idx);
                }
            }
        }
    }

    sampler.stop().await;
    fix_task.abort();

    snapshot.is_tracking = false;
    snapshot.timestamp = current_timestamp();
    snapshot.fixes_received = fixes_sent.load(Ordering::Relaxed);
    snapshot.accuracy = accuracy.latest();
    snapshot.average_accuracy = accuracy.average();
    snapshot.best_accuracy = accuracy.best();

    let path = format!("{}/snapshot.json", args.output_dir);
    snapshot.save(&path)?;
    println!(
        "[{}] Done: {} ticks, snapshot written to {}",
        ts_now(),
        snapshot.ticks_emitted,
        path
    );
    Ok(())
}

fn ts_now() -> String {
    Utc::now().format("%H:%M:%S%.3f").to_string()
}
