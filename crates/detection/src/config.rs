//! Immutable, validated detection parameters.

use vigil_common::config::DetectionSettings;
use vigil_common::error::{VigilError, VigilResult};

/// Per-run motion detection parameters.
///
/// Validated once at construction and read-only afterwards; changing a
/// parameter means building a new [`crate::MotionAnalyzer`].
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// Gaussian blur kernel size. Positive odd integer.
    pub blur_kernel_size: u32,

    /// Per-pixel difference threshold. Diff pixels above this become
    /// foreground in the binary mask.
    pub delta_threshold: u8,

    /// Dilation passes applied after the fixed close/open cleanup to merge
    /// nearby fragments into contiguous blobs.
    pub dilate_iterations: u32,

    /// Minimum pixel area for a connected component to count as a region.
    pub min_area: u64,

    /// Aggregate region area above which the frame counts as motion.
    pub motion_threshold: u64,
}

impl DetectionConfig {
    /// Build a validated config. Invalid parameters fail fast with a
    /// `Config` error; nothing is silently clamped.
    pub fn new(
        blur_kernel_size: u32,
        delta_threshold: u8,
        dilate_iterations: u32,
        min_area: u64,
        motion_threshold: u64,
    ) -> VigilResult<Self> {
        if blur_kernel_size == 0 || blur_kernel_size % 2 == 0 {
            return Err(VigilError::config(format!(
                "blur_kernel_size must be a positive odd integer, got {blur_kernel_size}"
            )));
        }
        if min_area == 0 {
            return Err(VigilError::config("min_area must be positive"));
        }
        if motion_threshold == 0 {
            return Err(VigilError::config("motion_threshold must be positive"));
        }
        Ok(Self {
            blur_kernel_size,
            delta_threshold,
            dilate_iterations,
            min_area,
            motion_threshold,
        })
    }

    /// Build from the raw on-disk settings section.
    pub fn from_settings(settings: &DetectionSettings) -> VigilResult<Self> {
        Self::new(
            settings.blur_kernel_size,
            settings.delta_threshold,
            settings.dilate_iterations,
            settings.min_area,
            settings.motion_threshold,
        )
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        // Defaults mirror DetectionSettings::default() and are always valid.
        Self {
            blur_kernel_size: 21,
            delta_threshold: 25,
            dilate_iterations: 2,
            min_area: 500,
            motion_threshold: 1000,
        }
    }
}

/// Validate a background learning rate. Must lie in (0, 1].
pub fn validate_learning_rate(learning_rate: f64) -> VigilResult<f64> {
    if learning_rate > 0.0 && learning_rate <= 1.0 {
        Ok(learning_rate)
    } else {
        Err(VigilError::config(format!(
            "learning_rate must be in (0, 1], got {learning_rate}"
        )))
    }
}
