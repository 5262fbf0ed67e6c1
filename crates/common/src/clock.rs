//! Clock utilities for frame timestamping.
//!
//! Every frame the capture worker publishes carries a monotonic timestamp
//! relative to a fixed epoch recorded when the run started. The gate's
//! cooldown arithmetic and the run loop's uptime reporting both work in
//! this timebase, so wall-clock adjustments never distort event cadence.

use std::time::Instant;

/// A monotonic clock anchored to a fixed epoch (the moment the run started).
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    /// The instant the run started.
    epoch: Instant,

    /// Wall-clock time at epoch (ISO 8601 string), kept for log correlation.
    epoch_wall: String,
}

impl MonotonicClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Get nanoseconds elapsed since the epoch.
    pub fn elapsed_ns(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    /// Get seconds elapsed since the epoch.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at the epoch.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }

    /// The underlying epoch instant.
    pub fn epoch(&self) -> Instant {
        self.epoch
    }

    /// Convert an elapsed nanosecond value to seconds.
    pub fn ns_to_secs(ns: u64) -> f64 {
        ns as f64 / 1_000_000_000.0
    }

    /// Convert seconds to nanoseconds.
    pub fn secs_to_ns(secs: f64) -> u64 {
        (secs * 1_000_000_000.0) as u64
    }
}
