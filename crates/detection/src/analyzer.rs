//! Per-frame motion analysis.
//!
//! The analyzer diffs a preprocessed frame against the background model,
//! thresholds the difference into a binary mask, cleans the mask with a
//! fixed close→open pass plus configurable dilation, and extracts connected
//! components as candidate regions. Two area filters run in sequence:
//! per-component `min_area` rejects noise blobs, aggregate
//! `motion_threshold` decides whether the scene as a whole moved. The
//! close→open→dilate ordering is load-bearing for noise suppression; only
//! the dilation count is configurable.

use std::collections::BTreeMap;

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::map::{map_colors, map_colors2};
use imageproc::morphology::{close, dilate, open};
use imageproc::rect::Rect;
use imageproc::region_labelling::{connected_components, Connectivity};
use vigil_common::error::VigilResult;

use crate::background::BackgroundModel;
use crate::config::DetectionConfig;
use crate::frame::preprocess;

/// Axis-aligned bounding description of one connected motion component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Measured component area in pixels.
    pub area: u64,
}

/// Result of analyzing a single frame.
#[derive(Debug)]
pub struct Detection {
    /// Whether aggregate motion area exceeded the motion threshold.
    pub motion_detected: bool,

    /// Surviving regions, in label order. Not retained across calls.
    pub regions: Vec<Region>,

    /// The post-morphology binary mask (or the preprocessed frame when the
    /// background was uninitialized). Useful for debug dumps.
    pub mask: GrayImage,
}

impl Detection {
    /// Sum of surviving region areas.
    pub fn total_area(&self) -> u64 {
        self.regions.iter().map(|r| r.area).sum()
    }
}

/// Frame-differencing motion analyzer.
pub struct MotionAnalyzer {
    config: DetectionConfig,
    frames_processed: u64,
    motion_frames: u64,
}

impl MotionAnalyzer {
    pub fn new(config: DetectionConfig) -> Self {
        Self {
            config,
            frames_processed: 0,
            motion_frames: 0,
        }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Frames analyzed since construction.
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Frames that reported motion since construction.
    pub fn motion_frames(&self) -> u64 {
        self.motion_frames
    }

    /// Analyze one frame against the background model.
    ///
    /// On an uninitialized background this reports no motion and returns
    /// the preprocessed frame as the mask; the caller is expected to
    /// initialize the background from this same frame afterwards, which is
    /// why detection and background update stay decoupled — the first
    /// frame can never falsely trigger.
    pub fn detect(
        &mut self,
        frame: &RgbImage,
        background: &BackgroundModel,
    ) -> VigilResult<Detection> {
        self.frames_processed += 1;

        let processed = preprocess(frame, &self.config);

        let Some(reference) = background.as_gray() else {
            return Ok(Detection {
                motion_detected: false,
                regions: Vec::new(),
                mask: processed,
            });
        };

        background.check_dimensions(frame.width(), frame.height())?;

        // Absolute pixelwise difference, then binary threshold. Diff
        // pixels equal to the threshold count as foreground.
        let diff: GrayImage = map_colors2(reference, &processed, |p, q| {
            Luma([p[0].abs_diff(q[0])])
        });
        let delta = self.config.delta_threshold;
        let mut mask: GrayImage =
            map_colors(&diff, |p| Luma([if p[0] >= delta { 255 } else { 0 }]));

        // Fixed 3x3 close (fill small gaps) then open (remove speckle),
        // then merge nearby fragments with configurable dilation.
        mask = close(&mask, Norm::LInf, 1);
        mask = open(&mask, Norm::LInf, 1);
        for _ in 0..self.config.dilate_iterations {
            mask = dilate(&mask, Norm::LInf, 1);
        }

        let regions = self.extract_regions(&mask);
        let total_area: u64 = regions.iter().map(|r| r.area).sum();
        let motion_detected = total_area > self.config.motion_threshold;

        if motion_detected {
            self.motion_frames += 1;
            tracing::debug!(
                total_area,
                regions = regions.len(),
                "Motion detected in frame"
            );
        }

        Ok(Detection {
            motion_detected,
            regions,
            mask,
        })
    }

    /// Label connected foreground components and keep those whose pixel
    /// area exceeds `min_area`.
    fn extract_regions(&self, mask: &GrayImage) -> Vec<Region> {
        let labeled = connected_components(mask, Connectivity::Eight, Luma([0u8]));

        #[derive(Clone, Copy)]
        struct Bounds {
            min_x: u32,
            min_y: u32,
            max_x: u32,
            max_y: u32,
            area: u64,
        }

        let mut components: BTreeMap<u32, Bounds> = BTreeMap::new();
        for (x, y, label) in labeled.enumerate_pixels() {
            let label = label[0];
            if label == 0 {
                continue;
            }
            components
                .entry(label)
                .and_modify(|b| {
                    b.min_x = b.min_x.min(x);
                    b.min_y = b.min_y.min(y);
                    b.max_x = b.max_x.max(x);
                    b.max_y = b.max_y.max(y);
                    b.area += 1;
                })
                .or_insert(Bounds {
                    min_x: x,
                    min_y: y,
                    max_x: x,
                    max_y: y,
                    area: 1,
                });
        }

        components
            .into_values()
            .filter(|b| b.area > self.config.min_area)
            .map(|b| Region {
                x: b.min_x,
                y: b.min_y,
                width: b.max_x - b.min_x + 1,
                height: b.max_y - b.min_y + 1,
                area: b.area,
            })
            .collect()
    }

    /// Draw region bounding boxes onto a copy of the frame.
    ///
    /// Pure rendering helper for snapshot annotation; detection state is
    /// never touched.
    pub fn annotate(&self, frame: &RgbImage, regions: &[Region]) -> RgbImage {
        annotate_regions(frame, regions)
    }
}

/// Draw region bounding boxes onto a copy of the frame.
pub fn annotate_regions(frame: &RgbImage, regions: &[Region]) -> RgbImage {
    let mut annotated = frame.clone();
    for region in regions {
        let rect =
            Rect::at(region.x as i32, region.y as i32).of_size(region.width, region.height);
        draw_hollow_rect_mut(&mut annotated, rect, Rgb([0, 255, 0]));
    }
    annotated
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid_frame(width: u32, height: u32, value: u8) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([value, value, value]))
    }

    /// A frame with a bright square blob on a dark backdrop.
    fn blob_frame(width: u32, height: u32, bx: u32, by: u32, size: u32) -> RgbImage {
        let mut frame = solid_frame(width, height, 0);
        for y in by..(by + size).min(height) {
            for x in bx..(bx + size).min(width) {
                frame.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        frame
    }

    fn small_kernel_config(min_area: u64, motion_threshold: u64) -> DetectionConfig {
        DetectionConfig::new(5, 25, 2, min_area, motion_threshold).unwrap()
    }

    #[test]
    fn test_first_frame_never_triggers() {
        let config = DetectionConfig::default();
        let mut analyzer = MotionAnalyzer::new(config.clone());
        let background = BackgroundModel::new(config);

        let detection = analyzer
            .detect(&solid_frame(64, 48, 200), &background)
            .unwrap();
        assert!(!detection.motion_detected);
        assert!(detection.regions.is_empty());
        assert_eq!(detection.mask.dimensions(), (64, 48));
    }

    #[test]
    fn test_full_frame_change_is_one_region() {
        let config = small_kernel_config(500, 1000);
        let mut analyzer = MotionAnalyzer::new(config.clone());
        let mut background = BackgroundModel::new(config);
        background.initialize_if_needed(&solid_frame(64, 48, 0));

        let detection = analyzer
            .detect(&solid_frame(64, 48, 255), &background)
            .unwrap();
        assert!(detection.motion_detected);
        assert_eq!(detection.regions.len(), 1);

        let region = detection.regions[0];
        // Whole frame flipped: one blob covering essentially everything.
        let full = 64 * 48;
        assert!(region.area as i64 >= full - 300, "area was {}", region.area);
        assert!(region.width >= 60 && region.height >= 44);
    }

    #[test]
    fn test_diff_equal_to_delta_is_foreground() {
        // A uniform change of exactly delta_threshold is motion, not
        // background: the pixel threshold is inclusive.
        let config = DetectionConfig::new(1, 25, 0, 50, 100).unwrap();
        let mut analyzer = MotionAnalyzer::new(config.clone());
        let mut background = BackgroundModel::new(config);
        background.initialize_if_needed(&solid_frame(64, 48, 0));

        let detection = analyzer
            .detect(&solid_frame(64, 48, 25), &background)
            .unwrap();
        assert!(detection.motion_detected);
        assert_eq!(detection.regions.len(), 1);
        assert_eq!(detection.regions[0].area, 64 * 48);

        // One step below the threshold stays quiet.
        let below = analyzer
            .detect(&solid_frame(64, 48, 24), &background)
            .unwrap();
        assert!(!below.motion_detected);
        assert!(below.regions.is_empty());
    }

    #[test]
    fn test_identical_frame_is_quiet() {
        let config = small_kernel_config(1, 1);
        let mut analyzer = MotionAnalyzer::new(config.clone());
        let mut background = BackgroundModel::new(config);
        let scene = blob_frame(64, 48, 10, 10, 20);
        background.initialize_if_needed(&scene);

        let detection = analyzer.detect(&scene, &background).unwrap();
        assert!(!detection.motion_detected);
        assert!(detection.regions.is_empty());
        assert!(detection.mask.iter().all(|&p| p == 0));
    }

    #[test]
    fn test_small_blob_filtered_by_min_area() {
        // A 6x6 intruder (36 px) is below min_area even after dilation.
        let config = small_kernel_config(400, 400);
        let mut analyzer = MotionAnalyzer::new(config.clone());
        let mut background = BackgroundModel::new(config);
        background.initialize_if_needed(&solid_frame(96, 96, 0));

        let detection = analyzer
            .detect(&blob_frame(96, 96, 40, 40, 6), &background)
            .unwrap();
        assert!(!detection.motion_detected);
        assert!(detection.regions.is_empty());
    }

    #[test]
    fn test_two_separated_blobs_are_two_regions() {
        let config = small_kernel_config(100, 200);
        let mut analyzer = MotionAnalyzer::new(config.clone());
        let mut background = BackgroundModel::new(config);
        background.initialize_if_needed(&solid_frame(128, 64, 0));

        let mut frame = blob_frame(128, 64, 8, 8, 20);
        for y in 20..40 {
            for x in 90..110 {
                frame.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }

        let detection = analyzer.detect(&frame, &background).unwrap();
        assert!(detection.motion_detected);
        assert_eq!(detection.regions.len(), 2);
        assert!(detection.total_area() > 600);
    }

    #[test]
    fn test_aggregate_threshold_gates_scene_decision() {
        // One medium blob passes min_area but the scene total stays below
        // the motion threshold, so no motion is reported.
        let config = DetectionConfig::new(5, 25, 0, 100, 5000).unwrap();
        let mut analyzer = MotionAnalyzer::new(config.clone());
        let mut background = BackgroundModel::new(config);
        background.initialize_if_needed(&solid_frame(128, 128, 0));

        let detection = analyzer
            .detect(&blob_frame(128, 128, 30, 30, 20), &background)
            .unwrap();
        assert!(!detection.motion_detected);
        assert_eq!(detection.regions.len(), 1);
        assert!(detection.total_area() < 5000);
    }

    #[test]
    fn test_dimension_mismatch_surfaces() {
        let config = DetectionConfig::default();
        let mut analyzer = MotionAnalyzer::new(config.clone());
        let mut background = BackgroundModel::new(config);
        background.initialize_if_needed(&solid_frame(64, 48, 0));

        let err = analyzer
            .detect(&solid_frame(32, 32, 0), &background)
            .unwrap_err();
        assert!(matches!(
            err,
            vigil_common::error::VigilError::DimensionMismatch { .. }
        ));
    }

    #[test]
    fn test_annotate_leaves_original_untouched() {
        let config = small_kernel_config(1, 1);
        let analyzer = MotionAnalyzer::new(config);
        let frame = solid_frame(32, 32, 10);
        let regions = vec![Region {
            x: 4,
            y: 4,
            width: 10,
            height: 10,
            area: 100,
        }];

        let annotated = analyzer.annotate(&frame, &regions);
        assert_eq!(frame.get_pixel(4, 4), &Rgb([10, 10, 10]));
        assert_eq!(annotated.get_pixel(4, 4), &Rgb([0, 255, 0]));
    }

    #[test]
    fn test_statistics_count_motion_frames() {
        let config = small_kernel_config(100, 500);
        let mut analyzer = MotionAnalyzer::new(config.clone());
        let mut background = BackgroundModel::new(config);
        background.initialize_if_needed(&solid_frame(64, 64, 0));

        analyzer
            .detect(&solid_frame(64, 64, 0), &background)
            .unwrap();
        analyzer
            .detect(&solid_frame(64, 64, 255), &background)
            .unwrap();
        assert_eq!(analyzer.frames_processed(), 2);
        assert_eq!(analyzer.motion_frames(), 1);
    }
}
