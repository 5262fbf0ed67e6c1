//! The collaborator seam for event persistence.

use image::RgbImage;
use vigil_common::error::VigilResult;

use crate::analyzer::Region;
use crate::gate::MotionEvent;

/// Receiver of admitted motion events.
///
/// Called at most once per admitted event. Implementations may fail
/// (disk full, permission lost); the run loop logs the failure and the
/// tick continues — a sink error never stops detection.
pub trait EventSink {
    fn on_motion_event(
        &mut self,
        event: &MotionEvent,
        frame: &RgbImage,
        regions: &[Region],
    ) -> VigilResult<()>;
}
