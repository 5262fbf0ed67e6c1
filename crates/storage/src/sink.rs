//! Event sink that persists annotated snapshots.

use image::RgbImage;
use vigil_common::error::VigilResult;
use vigil_detection::{annotate_regions, EventSink, MotionEvent, Region};

use crate::snapshot::SnapshotStore;

/// [`EventSink`] that draws region boxes onto the triggering frame and
/// writes it through a [`SnapshotStore`].
pub struct SnapshotSink {
    store: SnapshotStore,
    prefix: String,
    /// Whether to draw region bounding boxes before saving.
    draw_regions: bool,
    snapshots_saved: u64,
}

impl SnapshotSink {
    pub fn new(store: SnapshotStore, prefix: impl Into<String>, draw_regions: bool) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            draw_regions,
            snapshots_saved: 0,
        }
    }

    /// Snapshots written so far.
    pub fn snapshots_saved(&self) -> u64 {
        self.snapshots_saved
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }
}

impl EventSink for SnapshotSink {
    fn on_motion_event(
        &mut self,
        event: &MotionEvent,
        frame: &RgbImage,
        regions: &[Region],
    ) -> VigilResult<()> {
        let output = if self.draw_regions {
            annotate_regions(frame, regions)
        } else {
            frame.clone()
        };

        let (path, bytes) = self.store.save_snapshot(&output, &self.prefix)?;
        self.snapshots_saved += 1;

        tracing::info!(
            path = %path.display(),
            bytes,
            total_area = event.total_area,
            regions = event.region_count,
            "Motion snapshot saved"
        );
        Ok(())
    }
}
