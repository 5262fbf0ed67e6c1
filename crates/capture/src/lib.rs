//! Vigil Frame Acquisition
//!
//! Supplies the detection pipeline with raw frames. Uses a pluggable
//! backend architecture:
//!
//! - **Synthetic:** deterministic moving-blob generator (tests and
//!   `vigil run --synthetic`)
//! - **GStreamer:** V4L2 camera via a `v4l2src ! appsink` pipeline
//!   (feature `gstreamer`)
//!
//! The capture worker runs a backend on its own task and publishes into a
//! single-slot [`LatestFrame`] cell with overwrite semantics: a slow
//! consumer drops intermediate frames rather than queuing them, trading
//! completeness for freshness.

pub mod synthetic;
pub mod worker;

#[cfg(feature = "gstreamer")]
pub mod gst;

use std::sync::{Arc, Mutex};

use vigil_common::error::VigilResult;
use vigil_detection::RawFrame;

/// Trait for frame acquisition backends.
pub trait FrameSource: Send {
    /// Open or reopen the underlying device. Called once before the first
    /// read and again during error recovery.
    fn open(&mut self) -> VigilResult<()>;

    /// Poll for the next frame. Returns `None` when no frame is available
    /// yet; errors are counted by the worker toward recovery.
    fn read_frame(&mut self) -> VigilResult<Option<RawFrame>>;

    /// Configured capture dimensions.
    fn dimensions(&self) -> (u32, u32);

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Single-slot cell holding the most recent captured frame.
///
/// Writers overwrite whatever is there; `take` empties the slot so a
/// consumer never processes the same frame twice.
#[derive(Debug, Clone, Default)]
pub struct LatestFrame {
    slot: Arc<Mutex<Option<RawFrame>>>,
}

impl LatestFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a frame, replacing any unconsumed one.
    pub fn store(&self, frame: RawFrame) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(frame);
        }
    }

    /// Take the latest frame, leaving the slot empty.
    pub fn take(&self) -> Option<RawFrame> {
        self.slot.lock().ok().and_then(|mut slot| slot.take())
    }

    /// Whether a frame is waiting.
    pub fn is_ready(&self) -> bool {
        self.slot.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }
}
