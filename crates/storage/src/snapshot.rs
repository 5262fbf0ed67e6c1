//! Snapshot store: filenames, encoding, retention, diagnostics.

use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};
use vigil_common::error::{VigilError, VigilResult};

/// On-disk snapshot encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Jpeg { quality: u8 },
    Png,
}

impl SnapshotFormat {
    /// Parse the config representation. Quality outside 1-100 or an
    /// unknown format name fails fast.
    pub fn from_config(format: &str, quality: u8) -> VigilResult<Self> {
        match format {
            "jpg" | "jpeg" => {
                if !(1..=100).contains(&quality) {
                    return Err(VigilError::config(format!(
                        "snapshot quality must be 1-100, got {quality}"
                    )));
                }
                Ok(Self::Jpeg { quality })
            }
            "png" => Ok(Self::Png),
            other => Err(VigilError::config(format!(
                "unsupported snapshot format: {other}"
            ))),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg { .. } => "jpg",
            Self::Png => "png",
        }
    }
}

/// Aggregate statistics over the snapshot directory.
#[derive(Debug, Clone, Default)]
pub struct FileStats {
    pub total_files: usize,
    pub total_bytes: u64,
    pub oldest: Option<String>,
    pub newest: Option<String>,
}

impl FileStats {
    pub fn total_mb(&self) -> f64 {
        self.total_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Snapshot persistence with retention.
pub struct SnapshotStore {
    dir: PathBuf,
    format: SnapshotFormat,
}

impl SnapshotStore {
    /// Create a store, ensuring the directory exists.
    pub fn new(dir: impl Into<PathBuf>, format: SnapshotFormat) -> VigilResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| VigilError::storage(format!("cannot create {}: {e}", dir.display())))?;
        Ok(Self { dir, format })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Generate a unique timestamped filename, e.g.
    /// `motion_20260830_142530_123.jpg`.
    pub fn generate_filename(&self, prefix: &str) -> String {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S_%3f");
        format!("{prefix}_{timestamp}.{}", self.format.extension())
    }

    /// Encode and write a snapshot, returning its path and byte size.
    pub fn save_snapshot(&self, image: &RgbImage, prefix: &str) -> VigilResult<(PathBuf, u64)> {
        let path = self.dir.join(self.generate_filename(prefix));

        match self.format {
            SnapshotFormat::Jpeg { quality } => {
                let file = fs::File::create(&path)?;
                let mut writer = BufWriter::new(file);
                let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality);
                encoder.encode_image(image).map_err(|e| {
                    VigilError::storage(format!("jpeg encode failed for {}: {e}", path.display()))
                })?;
            }
            SnapshotFormat::Png => {
                image.save_with_format(&path, ImageFormat::Png).map_err(|e| {
                    VigilError::storage(format!("png encode failed for {}: {e}", path.display()))
                })?;
            }
        }

        let size = fs::metadata(&path)?.len();
        tracing::debug!(path = %path.display(), bytes = size, "Snapshot saved");
        Ok((path, size))
    }

    /// Paths the retention policy would delete: snapshots beyond the count
    /// limit first, then kept ones older than the age limit.
    pub fn cleanup_candidates(
        &self,
        max_files: usize,
        max_age_days: u32,
    ) -> VigilResult<Vec<PathBuf>> {
        let mut files = self.list_snapshots()?;

        // Newest first.
        files.sort_by(|a, b| b.1.cmp(&a.1));

        let cutoff = SystemTime::now()
            .checked_sub(Duration::from_secs(max_age_days as u64 * 24 * 60 * 60))
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut candidates: Vec<PathBuf> =
            files.iter().skip(max_files).map(|(p, _)| p.clone()).collect();
        candidates.extend(
            files
                .iter()
                .take(max_files)
                .filter(|(_, modified)| *modified < cutoff)
                .map(|(p, _)| p.clone()),
        );
        Ok(candidates)
    }

    /// Apply the retention policy. Returns the number of files deleted.
    /// Individual delete failures are logged and skipped, never fatal.
    pub fn cleanup_old_files(&self, max_files: usize, max_age_days: u32) -> VigilResult<usize> {
        let mut deleted = 0;
        for path in self.cleanup_candidates(max_files, max_age_days)? {
            match fs::remove_file(&path) {
                Ok(()) => {
                    deleted += 1;
                    tracing::debug!(path = %path.display(), "Deleted snapshot");
                }
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Delete failed"),
            }
        }

        if deleted > 0 {
            tracing::info!(deleted, "Snapshot cleanup completed");
        }
        Ok(deleted)
    }

    /// Statistics over the snapshot directory.
    pub fn file_statistics(&self) -> VigilResult<FileStats> {
        let mut files = self.list_snapshots()?;
        if files.is_empty() {
            return Ok(FileStats::default());
        }

        files.sort_by(|a, b| a.1.cmp(&b.1));
        let total_bytes = files
            .iter()
            .map(|(path, _)| fs::metadata(path).map(|m| m.len()).unwrap_or(0))
            .sum();

        let name_of = |path: &PathBuf| {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
        };

        Ok(FileStats {
            total_files: files.len(),
            total_bytes,
            oldest: files.first().and_then(|(p, _)| name_of(p)),
            newest: files.last().and_then(|(p, _)| name_of(p)),
        })
    }

    /// Available space on the snapshot filesystem, in megabytes.
    #[cfg(unix)]
    pub fn available_space_mb(&self) -> VigilResult<f64> {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let c_path = CString::new(self.dir.as_os_str().as_bytes())
            .map_err(|e| VigilError::storage(format!("bad path: {e}")))?;
        let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
        let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
        if rc != 0 {
            return Err(VigilError::Io(std::io::Error::last_os_error()));
        }
        let bytes = stat.f_bavail as u64 * stat.f_frsize as u64;
        Ok(bytes as f64 / (1024.0 * 1024.0))
    }

    /// Warn-level check that enough space remains for more snapshots.
    #[cfg(unix)]
    pub fn validate_storage_space(&self, required_mb: f64) -> VigilResult<bool> {
        let available = self.available_space_mb()?;
        if available < required_mb {
            tracing::warn!(
                available_mb = available,
                required_mb,
                "Low storage space for snapshots"
            );
            return Ok(false);
        }
        Ok(true)
    }

    /// Snapshot files with their modification times.
    fn list_snapshots(&self) -> VigilResult<Vec<(PathBuf, SystemTime)>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            let is_snapshot = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| matches!(e.to_ascii_lowercase().as_str(), "jpg" | "jpeg" | "png"))
                .unwrap_or(false);
            if !is_snapshot {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            files.push((path, modified));
        }
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn test_image() -> RgbImage {
        RgbImage::from_pixel(32, 24, Rgb([60, 120, 180]))
    }

    fn jpeg_store(dir: &Path) -> SnapshotStore {
        SnapshotStore::new(dir, SnapshotFormat::Jpeg { quality: 90 }).unwrap()
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!(
            SnapshotFormat::from_config("jpg", 95).unwrap(),
            SnapshotFormat::Jpeg { quality: 95 }
        );
        assert_eq!(
            SnapshotFormat::from_config("png", 95).unwrap(),
            SnapshotFormat::Png
        );
        assert!(SnapshotFormat::from_config("jpg", 0).is_err());
        assert!(SnapshotFormat::from_config("gif", 95).is_err());
    }

    #[test]
    fn test_filename_shape() {
        let dir = tempfile::tempdir().unwrap();
        let store = jpeg_store(dir.path());
        let name = store.generate_filename("motion");
        assert!(name.starts_with("motion_"));
        assert!(name.ends_with(".jpg"));
        // prefix _ YYYYmmdd _ HHMMSS _ mmm . ext
        assert_eq!(name.split('_').count(), 4);
    }

    #[test]
    fn test_save_and_stats() {
        let dir = tempfile::tempdir().unwrap();
        let store = jpeg_store(dir.path());

        let (path, size) = store.save_snapshot(&test_image(), "motion").unwrap();
        assert!(path.exists());
        assert!(size > 0);

        let stats = store.file_statistics().unwrap();
        assert_eq!(stats.total_files, 1);
        assert_eq!(stats.total_bytes, size);
        assert!(stats.oldest.is_some());
    }

    #[test]
    fn test_png_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path(), SnapshotFormat::Png).unwrap();
        let (path, _) = store.save_snapshot(&test_image(), "manual").unwrap();
        let loaded = image::open(&path).unwrap().to_rgb8();
        // PNG is lossless; the pixels survive intact.
        assert_eq!(loaded.get_pixel(5, 5), &Rgb([60, 120, 180]));
    }

    #[test]
    fn test_cleanup_count_limit() {
        let dir = tempfile::tempdir().unwrap();
        let store = jpeg_store(dir.path());
        for i in 0..5 {
            store.save_snapshot(&test_image(), &format!("m{i}")).unwrap();
        }

        let deleted = store.cleanup_old_files(2, 3650).unwrap();
        assert_eq!(deleted, 3);
        assert_eq!(store.file_statistics().unwrap().total_files, 2);
    }

    #[test]
    fn test_cleanup_age_limit_spares_fresh_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = jpeg_store(dir.path());
        store.save_snapshot(&test_image(), "motion").unwrap();

        // Everything here was written moments ago, so nothing is stale.
        let deleted = store.cleanup_old_files(100, 1).unwrap();
        assert_eq!(deleted, 0);
    }

    #[test]
    fn test_cleanup_ignores_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = jpeg_store(dir.path());
        std::fs::write(dir.path().join("notes.txt"), "keep me").unwrap();

        store.save_snapshot(&test_image(), "motion").unwrap();
        store.cleanup_old_files(0, 3650).unwrap();

        assert!(dir.path().join("notes.txt").exists());
        assert_eq!(store.file_statistics().unwrap().total_files, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_available_space_is_positive() {
        let dir = tempfile::tempdir().unwrap();
        let store = jpeg_store(dir.path());
        assert!(store.available_space_mb().unwrap() > 0.0);
    }
}
