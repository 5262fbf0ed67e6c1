//! Synthetic frame source: a bright blob orbiting a flat backdrop.
//!
//! Deterministic and hardware-free, so tests and `vigil run --synthetic`
//! can exercise the full pipeline. Frame N is a pure function of N.

use vigil_common::error::VigilResult;
use vigil_detection::RawFrame;

use crate::FrameSource;

const BACKDROP: u8 = 30;
const BLOB: u8 = 220;

/// Deterministic moving-blob frame generator.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    blob_size: u32,
    frame_index: u64,
    /// Nanoseconds advanced per generated frame.
    frame_interval_ns: u64,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32, framerate: u32) -> Self {
        Self {
            width,
            height,
            blob_size: (width.min(height) / 6).max(8),
            frame_index: 0,
            frame_interval_ns: 1_000_000_000 / framerate.max(1) as u64,
        }
    }

    /// Blob top-left corner for a given frame index: sweeps left to right,
    /// wrapping, on a fixed horizontal band.
    fn blob_position(&self, index: u64) -> (u32, u32) {
        let span = self.width.saturating_sub(self.blob_size).max(1) as u64;
        let x = (index * 4) % span;
        let y = (self.height - self.blob_size) / 2;
        (x as u32, y)
    }

    /// Generate the frame for an explicit index without advancing state.
    pub fn frame_at(&self, index: u64) -> RawFrame {
        let mut data = vec![BACKDROP; self.width as usize * self.height as usize * 3];
        let (bx, by) = self.blob_position(index);

        for y in by..(by + self.blob_size).min(self.height) {
            for x in bx..(bx + self.blob_size).min(self.width) {
                let offset = (y as usize * self.width as usize + x as usize) * 3;
                data[offset] = BLOB;
                data[offset + 1] = BLOB;
                data[offset + 2] = BLOB;
            }
        }

        RawFrame {
            width: self.width,
            height: self.height,
            data,
            timestamp_ns: index * self.frame_interval_ns,
        }
    }
}

impl FrameSource for SyntheticSource {
    fn open(&mut self) -> VigilResult<()> {
        Ok(())
    }

    fn read_frame(&mut self) -> VigilResult<Option<RawFrame>> {
        let frame = self.frame_at(self.frame_index);
        self.frame_index += 1;
        Ok(Some(frame))
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_are_deterministic() {
        let source = SyntheticSource::new(160, 120, 30);
        let a = source.frame_at(5);
        let b = source.frame_at(5);
        assert_eq!(a.data, b.data);
        assert_eq!(a.timestamp_ns, b.timestamp_ns);
    }

    #[test]
    fn test_blob_moves_between_frames() {
        let source = SyntheticSource::new(160, 120, 30);
        let a = source.frame_at(0);
        let b = source.frame_at(10);
        assert_ne!(a.data, b.data);
    }

    #[test]
    fn test_read_frame_advances() {
        let mut source = SyntheticSource::new(160, 120, 30);
        let a = source.read_frame().unwrap().unwrap();
        let b = source.read_frame().unwrap().unwrap();
        assert!(b.timestamp_ns > a.timestamp_ns);
    }

    #[test]
    fn test_frame_decodes() {
        let source = SyntheticSource::new(64, 48, 30);
        let rgb = source.frame_at(3).decode().unwrap();
        assert_eq!(rgb.dimensions(), (64, 48));
    }
}
