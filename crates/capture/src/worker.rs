//! Capture worker: runs a frame source on its own task.
//!
//! Reads frames from a backend, restamps them into the run's monotonic
//! timebase, and publishes them into the shared [`LatestFrame`] cell.
//! Transient read errors are tolerated up to a limit; past it the worker
//! backs off and reopens the device, so a camera that drops off the bus
//! recovers without restarting the process.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use vigil_common::clock::MonotonicClock;
use vigil_common::error::VigilResult;

use crate::{FrameSource, LatestFrame};

/// Error recovery policy for the capture loop.
#[derive(Debug, Clone)]
pub struct RecoveryPolicy {
    /// Consecutive errors tolerated before attempting recovery.
    pub max_consecutive_errors: u32,

    /// Delay before reopening the source.
    pub recovery_delay: Duration,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            max_consecutive_errors: 5,
            recovery_delay: Duration::from_secs(5),
        }
    }
}

/// The capture worker that feeds the latest-frame cell.
pub struct CaptureWorker {
    source: Box<dyn FrameSource>,
    latest: LatestFrame,
    clock: MonotonicClock,
    policy: RecoveryPolicy,
    stop_flag: Arc<AtomicBool>,
    frames_captured: Arc<AtomicU64>,
}

impl CaptureWorker {
    pub fn new(
        source: Box<dyn FrameSource>,
        latest: LatestFrame,
        clock: MonotonicClock,
        policy: RecoveryPolicy,
    ) -> Self {
        Self {
            source,
            latest,
            clock,
            policy,
            stop_flag: Arc::new(AtomicBool::new(false)),
            frames_captured: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Get the stop flag for external coordination.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    /// Shared frames-captured counter for stats reporting.
    pub fn frames_captured(&self) -> Arc<AtomicU64> {
        self.frames_captured.clone()
    }

    /// Run the capture loop until the stop flag is set.
    ///
    /// Returns the number of frames published.
    pub async fn run(mut self) -> VigilResult<u64> {
        tracing::info!(backend = %self.source.name(), "Capture worker started");
        self.source.open()?;

        let mut consecutive_errors: u32 = 0;

        while !self.stop_flag.load(Ordering::Relaxed) {
            match self.source.read_frame() {
                Ok(Some(mut frame)) => {
                    frame.timestamp_ns = self.clock.elapsed_ns();
                    self.latest.store(frame);
                    self.frames_captured.fetch_add(1, Ordering::Relaxed);
                    consecutive_errors = 0;

                    // Yield so the detection task is never starved.
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
                Ok(None) => {
                    // No frame available yet.
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
                Err(e) => {
                    consecutive_errors += 1;
                    tracing::warn!(
                        error = %e,
                        consecutive_errors,
                        limit = self.policy.max_consecutive_errors,
                        "Frame capture error"
                    );

                    if consecutive_errors >= self.policy.max_consecutive_errors {
                        self.attempt_recovery().await;
                        consecutive_errors = 0;
                    }
                }
            }
        }

        let total = self.frames_captured.load(Ordering::Relaxed);
        tracing::info!(frames = total, "Capture worker stopped");
        Ok(total)
    }

    async fn attempt_recovery(&mut self) {
        tracing::error!(
            backend = %self.source.name(),
            "Maximum consecutive capture errors reached, attempting recovery"
        );
        tokio::time::sleep(self.policy.recovery_delay).await;

        match self.source.open() {
            Ok(()) => tracing::info!(backend = %self.source.name(), "Capture recovery successful"),
            Err(e) => tracing::error!(error = %e, "Capture recovery failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::SyntheticSource;
    use vigil_common::error::VigilError;
    use vigil_detection::RawFrame;

    /// A source that fails a fixed number of reads before succeeding.
    struct FlakySource {
        failures_left: u32,
        opens: u32,
        inner: SyntheticSource,
    }

    impl FrameSource for FlakySource {
        fn open(&mut self) -> VigilResult<()> {
            self.opens += 1;
            Ok(())
        }

        fn read_frame(&mut self) -> VigilResult<Option<RawFrame>> {
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(VigilError::capture("simulated device stall"));
            }
            self.inner.read_frame()
        }

        fn dimensions(&self) -> (u32, u32) {
            self.inner.dimensions()
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn test_worker_publishes_frames() {
        let latest = LatestFrame::new();
        let worker = CaptureWorker::new(
            Box::new(SyntheticSource::new(32, 32, 30)),
            latest.clone(),
            MonotonicClock::start(),
            RecoveryPolicy::default(),
        );
        let stop = worker.stop_flag();
        let counter = worker.frames_captured();

        let handle = tokio::spawn(worker.run());
        tokio::time::sleep(Duration::from_millis(50)).await;
        stop.store(true, Ordering::SeqCst);

        let total = handle.await.unwrap().unwrap();
        assert!(total > 0);
        assert_eq!(counter.load(Ordering::Relaxed), total);
        assert!(latest.take().is_some());
    }

    #[tokio::test]
    async fn test_worker_recovers_from_error_burst() {
        let latest = LatestFrame::new();
        let source = FlakySource {
            failures_left: 3,
            opens: 0,
            inner: SyntheticSource::new(32, 32, 30),
        };
        let worker = CaptureWorker::new(
            Box::new(source),
            latest.clone(),
            MonotonicClock::start(),
            RecoveryPolicy {
                max_consecutive_errors: 2,
                recovery_delay: Duration::from_millis(1),
            },
        );
        let stop = worker.stop_flag();

        let handle = tokio::spawn(worker.run());
        tokio::time::sleep(Duration::from_millis(100)).await;
        stop.store(true, Ordering::SeqCst);

        // Despite the initial failures the worker ends up publishing.
        let total = handle.await.unwrap().unwrap();
        assert!(total > 0);
    }
}
