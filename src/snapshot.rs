//! Live tracking status for operator display.
//!
//! The snapshot is an explicit value produced by whoever drives the
//! pipeline and handed to consumers; nothing here is a global.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

/// Reported accuracies the rolling statistics are computed over.
const ACCURACY_WINDOW: usize = 20;

/// Rolling statistics over the most recent reported fix accuracies
/// (meters). GPS accuracy drifts with sky view during a practice session;
/// the HUD shows current, average, and best-seen so the operator can judge
/// whether a calibration pass is worth taking now.
#[derive(Clone, Debug, Default)]
pub struct AccuracyTracker {
    window: VecDeque<f64>,
}

impl AccuracyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, accuracy: f64) {
        self.window.push_back(accuracy);
        while self.window.len() > ACCURACY_WINDOW {
            self.window.pop_front();
        }
    }

    pub fn latest(&self) -> Option<f64> {
        self.window.back().copied()
    }

    pub fn average(&self) -> Option<f64> {
        if self.window.is_empty() {
            return None;
        }
        Some(self.window.iter().sum::<f64>() / self.window.len() as f64)
    }

    pub fn best(&self) -> Option<f64> {
        self.window.iter().copied().fold(None, |best, v| match best {
            Some(b) if b <= v => Some(b),
            _ => Some(v),
        })
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}

/// Point-in-time status of the tracking pipeline, written as JSON for
/// dashboards or debugging.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TrackingSnapshot {
    pub timestamp: f64,
    pub is_tracking: bool,
    pub fixes_received: u64,
    pub ticks_emitted: u64,
    pub accuracy: Option<f64>,
    pub average_accuracy: Option<f64>,
    pub best_accuracy: Option<f64>,
    pub calibrated: bool,
    pub calibration_rms: Option<f64>,
}

impl TrackingSnapshot {
    pub fn new() -> Self {
        Self {
            timestamp: current_timestamp(),
            is_tracking: false,
            fixes_received: 0,
            ticks_emitted: 0,
            accuracy: None,
            average_accuracy: None,
            best_accuracy: None,
            calibrated: false,
            calibration_rms: None,
        }
    }

    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl Default for TrackingSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

pub fn current_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
