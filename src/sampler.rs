//! Fixed-rate sampling driver between raw GPS fixes and the UI cadence.
//!
//! Fix arrival is device-dependent and irregular; consumers want a steady
//! tick. The driver keeps only the most recent fix (a watch slot,
//! last-write-wins) and on every tick feeds it to the Kalman smoother,
//! emitting the estimate over a bounded channel. Ticks before the first
//! fix are no-ops, and a lagging consumer loses ticks rather than building
//! a backlog: a stale guidance frame is worthless the moment the next one
//! exists.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};

use crate::filters::Kalman2D;
use crate::types::{GpsFix, TrackerConfig};

/// Outbound capacity. Ticks are disposable, so this only needs to cover a
/// briefly stalled consumer.
const TICK_CHANNEL_CAPACITY: usize = 64;

/// Minimum tick period regardless of configured hz.
const MIN_PERIOD_MS: u64 = 100;

/// One smoothed (or passed-through) estimate emitted per tick. Accuracy is
/// carried over from the raw fix untouched; the smoother knows nothing
/// about it.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SmoothedTick {
    pub lat: f64,
    pub lon: f64,
    pub t: f64,
    pub accuracy: Option<f64>,
}

/// Handle to the background sampling task.
///
/// The filter state lives inside the task; the handle only pushes fixes and
/// signals shutdown, so there is no shared mutable state to race on.
pub struct GpsSampler {
    fix_tx: Arc<watch::Sender<Option<GpsFix>>>,
    shutdown_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

/// Cloneable producer handle onto the latest-fix slot, for the task or
/// callback that receives raw fixes from the location service.
#[derive(Clone)]
pub struct FixSender {
    tx: Arc<watch::Sender<Option<GpsFix>>>,
}

impl FixSender {
    /// Overwrite the latest-fix slot. Returns false once the sampler has
    /// stopped, so producer loops know to wind down.
    ///
    /// Non-finite fixes are dropped here so the filter only ever sees
    /// validated input.
    pub fn push(&self, fix: GpsFix) -> bool {
        if !(fix.lat.is_finite() && fix.lon.is_finite() && fix.t.is_finite()) {
            log::warn!("dropping non-finite gps fix at t={}", fix.t);
            return true;
        }
        self.tx.send(Some(fix)).is_ok()
    }
}

impl GpsSampler {
    /// Spawn the driver at the configured rate. Returns the handle and the
    /// tick stream.
    pub fn spawn(config: TrackerConfig) -> (Self, mpsc::Receiver<SmoothedTick>) {
        let (fix_tx, fix_rx) = watch::channel(None::<GpsFix>);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (tick_tx, tick_rx) = mpsc::channel(TICK_CHANNEL_CAPACITY);

        let handle = tokio::spawn(sample_loop(config, fix_rx, shutdown_rx, tick_tx));

        (
            Self {
                fix_tx: Arc::new(fix_tx),
                shutdown_tx,
                handle: Some(handle),
            },
            tick_rx,
        )
    }

    pub fn fix_sender(&self) -> FixSender {
        FixSender {
            tx: Arc::clone(&self.fix_tx),
        }
    }

    /// Overwrite the latest-fix slot. Fixes arriving faster than the tick
    /// rate replace each other; only the newest is ever smoothed.
    pub fn push_fix(&self, fix: GpsFix) {
        self.fix_sender().push(fix);
    }

    /// Stop the driver. Idempotent; once this returns no further tick will
    /// fire or be delivered.
    pub async fn stop(&mut self) {
        self.shutdown_tx.send_replace(true);
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                log::warn!("sampler task ended abnormally: {err}");
            }
        }
    }
}

fn tick_period(hz: f64) -> Duration {
    let ms = (1000.0 / hz).round() as u64;
    Duration::from_millis(ms.max(MIN_PERIOD_MS))
}

async fn sample_loop(
    config: TrackerConfig,
    fix_rx: watch::Receiver<Option<GpsFix>>,
    mut shutdown_rx: watch::Receiver<bool>,
    tick_tx: mpsc::Sender<SmoothedTick>,
) {
    let mut kf = Kalman2D::new(config.process_noise, config.measurement_noise);
    let mut ticker = interval(tick_period(config.hz));
    let mut emitted = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let fix = match *fix_rx.borrow() {
                    Some(fix) => fix,
                    None => continue, // nothing received yet
                };

                let est = if config.smoothing {
                    kf.update(fix.geo_point())
                } else {
                    fix.geo_point()
                };

                let tick = SmoothedTick {
                    lat: est.lat,
                    lon: est.lon,
                    t: est.t,
                    accuracy: fix.accuracy,
                };

                match tick_tx.try_send(tick) {
                    Ok(()) => {
                        emitted += 1;
                        if emitted % 100 == 0 {
                            log::debug!("[sampler] {} ticks emitted", emitted);
                        }
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        log::info!("[sampler] consumer gone after {} ticks", emitted);
                        break;
                    }
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        // Consumer lagging, drop this tick
                    }
                }
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    log::debug!("[sampler] shutdown after {} ticks", emitted);
                    break;
                }
            }
        }
    }
}
