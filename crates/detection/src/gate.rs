//! Temporal admission control for motion events.
//!
//! Converts the per-frame motion signal into rate-limited discrete events
//! so one sustained motion episode cannot flood the sink with snapshots
//! every tick. The cooldown is measured from the last *admitted* event,
//! not from when motion started or stopped, so continuous motion produces
//! events at a steady cadence of one per cooldown interval.

use std::time::Duration;

use crate::analyzer::Detection;

/// A discrete motion occurrence that passed the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionEvent {
    /// Admission time, nanoseconds since the run epoch.
    pub timestamp_ns: u64,

    /// Sum of surviving region areas in the triggering frame.
    pub total_area: u64,

    /// Number of surviving regions in the triggering frame.
    pub region_count: usize,
}

/// Cooldown gate between per-frame detections and emitted events.
#[derive(Debug)]
pub struct MotionGate {
    cooldown_ns: u64,
    last_event_ns: Option<u64>,
}

impl MotionGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown_ns: cooldown.as_nanos() as u64,
            last_event_ns: None,
        }
    }

    /// Offer a detection to the gate at the given monotonic time.
    ///
    /// Returns an event iff the detection reported motion and either no
    /// event has been admitted yet or the cooldown since the last admitted
    /// event has elapsed. A suppressed or motionless detection leaves the
    /// gate state untouched.
    pub fn admit(&mut self, detection: &Detection, now_ns: u64) -> Option<MotionEvent> {
        if !detection.motion_detected {
            return None;
        }

        match self.last_event_ns {
            Some(last) if now_ns.saturating_sub(last) < self.cooldown_ns => None,
            _ => {
                self.last_event_ns = Some(now_ns);
                Some(MotionEvent {
                    timestamp_ns: now_ns,
                    total_area: detection.total_area(),
                    region_count: detection.regions.len(),
                })
            }
        }
    }

    /// Clear the cooldown so the next motion frame is admitted immediately.
    /// Used for manual/forced capture commands.
    pub fn reset_cooldown(&mut self) {
        self.last_event_ns = None;
    }

    /// Timestamp of the last admitted event, if any.
    pub fn last_event_ns(&self) -> Option<u64> {
        self.last_event_ns
    }

    /// The configured cooldown.
    pub fn cooldown(&self) -> Duration {
        Duration::from_nanos(self.cooldown_ns)
    }
}
