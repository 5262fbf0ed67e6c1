//! Adaptive background model.
//!
//! Holds a single preprocessed reference frame representing the empty
//! scene and blends each new frame into it with an exponential moving
//! average. The default learning rate of 0.05 tracks slow lighting drift
//! over tens of seconds without absorbing a stationary intruder within a
//! typical dwell time.

use image::GrayImage;
use vigil_common::error::{VigilError, VigilResult};

use crate::config::{validate_learning_rate, DetectionConfig};
use crate::frame::preprocess;

/// The adaptive background reference frame.
///
/// Lifecycle: uninitialized at construction, initialized on the first
/// frame, blended in place on every subsequent tick, and explicitly
/// resettable back to uninitialized when the scene baseline changes
/// (camera bumped, lights switched).
#[derive(Debug)]
pub struct BackgroundModel {
    config: DetectionConfig,
    frame: Option<GrayImage>,
}

impl BackgroundModel {
    pub fn new(config: DetectionConfig) -> Self {
        Self {
            config,
            frame: None,
        }
    }

    /// Whether a background frame has been established.
    pub fn is_initialized(&self) -> bool {
        self.frame.is_some()
    }

    /// Established background dimensions, if initialized.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.frame.as_ref().map(|f| f.dimensions())
    }

    /// Copy-on-read view of the background frame for renderers and
    /// debug dumps. Readers get a snapshot, never a live reference that
    /// could tear mid-update.
    pub fn snapshot(&self) -> Option<GrayImage> {
        self.frame.clone()
    }

    /// Borrow the preprocessed background for diffing within a tick.
    pub(crate) fn as_gray(&self) -> Option<&GrayImage> {
        self.frame.as_ref()
    }

    /// Initialize from the given frame if no background exists yet.
    /// Idempotent: repeated calls while initialized are no-ops, so only
    /// the first frame establishes the baseline.
    pub fn initialize_if_needed(&mut self, frame: &image::RgbImage) {
        if self.frame.is_none() {
            self.frame = Some(preprocess(frame, &self.config));
            tracing::info!(
                width = frame.width(),
                height = frame.height(),
                "Background frame initialized"
            );
        }
    }

    /// Blend the given frame into the background:
    /// `new = (1 - rate) * old + rate * preprocess(frame)`, rounded to u8.
    ///
    /// Uninitialized models initialize instead. A learning rate of 1.0
    /// fully replaces the background; rates outside (0, 1] are a config
    /// error. Frames whose dimensions disagree with the established
    /// background are a fatal `DimensionMismatch`, never a silent resize.
    pub fn update(&mut self, frame: &image::RgbImage, learning_rate: f64) -> VigilResult<()> {
        let rate = validate_learning_rate(learning_rate)? as f32;

        let Some(expected) = self.dimensions() else {
            self.initialize_if_needed(frame);
            return Ok(());
        };
        dimension_check(expected, frame.dimensions())?;

        let processed = preprocess(frame, &self.config);
        if let Some(background) = self.frame.as_mut() {
            for (old, new) in background.iter_mut().zip(processed.iter()) {
                *old = ((1.0 - rate) * *old as f32 + rate * *new as f32).round() as u8;
            }
        }
        Ok(())
    }

    /// Drop the stored frame and return to uninitialized. The next frame
    /// processed becomes the new baseline.
    pub fn reset(&mut self) {
        self.frame = None;
        tracing::info!("Background model reset");
    }

    /// Verify an incoming frame matches the established background size.
    pub fn check_dimensions(&self, width: u32, height: u32) -> VigilResult<()> {
        match self.dimensions() {
            Some(expected) => dimension_check(expected, (width, height)),
            None => Ok(()),
        }
    }
}

fn dimension_check(expected: (u32, u32), actual: (u32, u32)) -> VigilResult<()> {
    if expected != actual {
        return Err(VigilError::DimensionMismatch {
            expected_width: expected.0,
            expected_height: expected.1,
            actual_width: actual.0,
            actual_height: actual.1,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid_frame(width: u32, height: u32, value: u8) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([value, value, value]))
    }

    #[test]
    fn test_starts_uninitialized() {
        let model = BackgroundModel::new(DetectionConfig::default());
        assert!(!model.is_initialized());
        assert!(model.snapshot().is_none());
    }

    #[test]
    fn test_initialize_if_needed_is_idempotent() {
        let mut model = BackgroundModel::new(DetectionConfig::default());
        model.initialize_if_needed(&solid_frame(16, 16, 0));
        let first = model.snapshot().unwrap();

        // Second call with a very different frame must not touch the model.
        model.initialize_if_needed(&solid_frame(16, 16, 255));
        let second = model.snapshot().unwrap();
        assert_eq!(first.as_raw(), second.as_raw());
    }

    #[test]
    fn test_update_with_rate_one_replaces() {
        let config = DetectionConfig::default();
        let mut model = BackgroundModel::new(config.clone());
        model.initialize_if_needed(&solid_frame(16, 16, 0));

        let bright = solid_frame(16, 16, 200);
        model.update(&bright, 1.0).unwrap();

        let expected = preprocess(&bright, &config);
        assert_eq!(model.snapshot().unwrap().as_raw(), expected.as_raw());
    }

    #[test]
    fn test_update_with_rate_zero_rejected() {
        let mut model = BackgroundModel::new(DetectionConfig::default());
        model.initialize_if_needed(&solid_frame(16, 16, 0));
        assert!(model.update(&solid_frame(16, 16, 200), 0.0).is_err());
        // And the background is untouched by the failed update.
        let gray = model.snapshot().unwrap();
        assert!(gray.iter().all(|&p| p < 10));
    }

    #[test]
    fn test_update_blends_toward_new_frame() {
        let mut model = BackgroundModel::new(DetectionConfig::default());
        model.initialize_if_needed(&solid_frame(16, 16, 0));

        model.update(&solid_frame(16, 16, 200), 0.05).unwrap();
        let gray = model.snapshot().unwrap();
        let center = gray.get_pixel(8, 8)[0];
        // 5% of the way toward 200
        assert!(center >= 8 && center <= 12, "center was {center}");
    }

    #[test]
    fn test_update_on_uninitialized_initializes() {
        let mut model = BackgroundModel::new(DetectionConfig::default());
        model.update(&solid_frame(16, 16, 90), 0.05).unwrap();
        assert!(model.is_initialized());
    }

    #[test]
    fn test_dimension_mismatch_is_fatal() {
        let mut model = BackgroundModel::new(DetectionConfig::default());
        model.initialize_if_needed(&solid_frame(16, 16, 0));

        let err = model.update(&solid_frame(32, 32, 0), 0.05).unwrap_err();
        assert!(matches!(err, VigilError::DimensionMismatch { .. }));

        // Explicit reset recovers.
        model.reset();
        assert!(!model.is_initialized());
        model.update(&solid_frame(32, 32, 0), 0.05).unwrap();
        assert_eq!(model.dimensions(), Some((32, 32)));
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut model = BackgroundModel::new(DetectionConfig::default());
        model.initialize_if_needed(&solid_frame(8, 8, 50));
        let before = model.snapshot().unwrap();
        model.update(&solid_frame(8, 8, 250), 1.0).unwrap();
        let after = model.snapshot().unwrap();
        assert_ne!(before.as_raw(), after.as_raw());
    }
}
