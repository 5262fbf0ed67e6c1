//! Raw frame container and preprocessing.
//!
//! Capture backends produce [`RawFrame`]s — packed RGB24 bytes plus
//! dimensions and a monotonic timestamp. Decoding validates the buffer, so
//! a corrupt capture surfaces as a transient error the run loop can skip
//! instead of a panic mid-tick. Every derived image (gray, blurred, diff,
//! mask) is a fresh buffer; stages never alias each other's storage.

use image::{GrayImage, RgbImage};
use imageproc::filter::gaussian_blur_f32;
use vigil_common::error::{VigilError, VigilResult};

use crate::config::DetectionConfig;

/// A single captured frame: packed RGB24 pixel data with explicit
/// dimensions and a capture timestamp in the run's monotonic timebase.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    /// Packed RGB24 bytes, row-major, no padding.
    pub data: Vec<u8>,
    /// Nanoseconds since the run epoch at capture time.
    pub timestamp_ns: u64,
}

impl RawFrame {
    /// Expected byte length for the declared dimensions.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// Decode into an owned [`RgbImage`].
    ///
    /// A buffer that disagrees with the declared dimensions is a transient
    /// frame error: the caller skips the tick and keeps its background.
    pub fn decode(&self) -> VigilResult<RgbImage> {
        if self.data.len() != self.expected_len() {
            return Err(VigilError::transient_frame(format!(
                "frame buffer is {} bytes, expected {} for {}x{}",
                self.data.len(),
                self.expected_len(),
                self.width,
                self.height
            )));
        }
        RgbImage::from_raw(self.width, self.height, self.data.clone()).ok_or_else(|| {
            VigilError::transient_frame(format!(
                "frame buffer rejected for {}x{}",
                self.width, self.height
            ))
        })
    }
}

/// Convert a color frame to blurred grayscale.
///
/// Pure function of the input and config: same frame in, byte-identical
/// image out. The background model and the analyzer both go through this
/// so the diff always compares like with like.
pub fn preprocess(frame: &RgbImage, config: &DetectionConfig) -> GrayImage {
    let gray = image::imageops::grayscale(frame);
    gaussian_blur_f32(&gray, kernel_sigma(config.blur_kernel_size))
}

/// Map a blur kernel size to a Gaussian sigma.
///
/// Uses the conventional `0.3 * ((k - 1) * 0.5 - 1) + 0.8` rule so that a
/// given kernel size produces the same effective smoothing as the usual
/// auto-sigma behavior of reference implementations.
pub fn kernel_sigma(kernel_size: u32) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid_frame(width: u32, height: u32, value: u8) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([value, value, value]))
    }

    #[test]
    fn test_decode_valid_buffer() {
        let frame = RawFrame {
            width: 4,
            height: 2,
            data: vec![128; 4 * 2 * 3],
            timestamp_ns: 0,
        };
        let rgb = frame.decode().unwrap();
        assert_eq!(rgb.dimensions(), (4, 2));
    }

    #[test]
    fn test_decode_short_buffer_is_transient() {
        let frame = RawFrame {
            width: 4,
            height: 2,
            data: vec![0; 5],
            timestamp_ns: 0,
        };
        let err = frame.decode().unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_preprocess_is_deterministic() {
        let config = DetectionConfig::default();
        let frame = solid_frame(32, 24, 77);
        let a = preprocess(&frame, &config);
        let b = preprocess(&frame, &config);
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn test_preprocess_preserves_dimensions() {
        let config = DetectionConfig::default();
        let frame = solid_frame(33, 17, 10);
        let gray = preprocess(&frame, &config);
        assert_eq!(gray.dimensions(), (33, 17));
    }

    #[test]
    fn test_kernel_sigma_monotonic() {
        assert!(kernel_sigma(3) < kernel_sigma(21));
        assert!(kernel_sigma(1) > 0.0);
    }
}
