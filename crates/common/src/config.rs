//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{VigilError, VigilResult};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Camera settings.
    pub camera: CameraConfig,

    /// Motion detection settings.
    pub detection: DetectionSettings,

    /// Snapshot storage settings.
    pub storage: StorageConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Camera capture parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Capture width in pixels.
    pub width: u32,

    /// Capture height in pixels.
    pub height: u32,

    /// Target capture framerate.
    pub framerate: u32,

    /// Seconds to let the sensor settle before the first frame is used.
    pub warmup_secs: f64,

    /// V4L2 device index (e.g. 0 for /dev/video0).
    pub device_index: u32,
}

/// Raw motion detection parameters as loaded from disk.
///
/// These are unvalidated; the detection crate turns them into an
/// immutable, validated `DetectionConfig` at analyzer construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionSettings {
    /// Gaussian blur kernel size (must be a positive odd integer).
    pub blur_kernel_size: u32,

    /// Per-pixel difference threshold (0-255).
    pub delta_threshold: u8,

    /// Number of dilation passes after morphological cleanup.
    pub dilate_iterations: u32,

    /// Minimum pixel area for a region to survive filtering.
    pub min_area: u64,

    /// Aggregate area above which the scene counts as moving.
    pub motion_threshold: u64,

    /// Background learning rate in (0, 1].
    pub learning_rate: f64,

    /// Minimum seconds between two admitted motion events.
    pub cooldown_secs: f64,
}

/// Snapshot storage parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory snapshots are written to.
    pub output_dir: PathBuf,

    /// Snapshot format: "jpg" or "png".
    pub snapshot_format: String,

    /// JPEG quality (1-100).
    pub snapshot_quality: u8,

    /// Maximum snapshots to keep on disk.
    pub max_snapshots: usize,

    /// Maximum snapshot age in days before cleanup removes it.
    pub max_age_days: u32,

    /// Whether periodic retention cleanup runs during `vigil run`.
    pub cleanup_enabled: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "vigil=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            detection: DetectionSettings::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            framerate: 30,
            warmup_secs: 2.0,
            device_index: 0,
        }
    }
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            blur_kernel_size: 21,
            delta_threshold: 25,
            dilate_iterations: 2,
            min_area: 500,
            motion_threshold: 1000,
            learning_rate: 0.05,
            cooldown_secs: 5.0,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: dirs_default_snapshots(),
            snapshot_format: "jpg".to_string(),
            snapshot_quality: 95,
            max_snapshots: 1000,
            max_age_days: 30,
            cleanup_enabled: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from an explicit path, or the standard location,
    /// falling back to defaults.
    pub fn load(path: Option<&Path>) -> Self {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(config_file_path);
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the given path, or the standard location.
    pub fn save(&self, path: Option<&Path>) -> Result<(), std::io::Error> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(config_file_path);
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }

    /// Validate the sections the common crate owns. Detection parameters
    /// get their strict validation in `vigil-detection` when the analyzer
    /// is built; camera and storage limits are checked here.
    pub fn validate(&self) -> VigilResult<()> {
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(VigilError::config("camera resolution must be positive"));
        }
        if self.camera.framerate == 0 {
            return Err(VigilError::config("camera framerate must be positive"));
        }
        if self.camera.warmup_secs < 0.0 {
            return Err(VigilError::config("camera warmup cannot be negative"));
        }
        if !(1..=100).contains(&self.storage.snapshot_quality) {
            return Err(VigilError::config(format!(
                "snapshot quality must be 1-100, got {}",
                self.storage.snapshot_quality
            )));
        }
        match self.storage.snapshot_format.as_str() {
            "jpg" | "jpeg" | "png" => {}
            other => {
                return Err(VigilError::config(format!(
                    "unsupported snapshot format: {other}"
                )))
            }
        }
        if self.detection.cooldown_secs < 0.0 {
            return Err(VigilError::config("cooldown cannot be negative"));
        }
        Ok(())
    }

    /// One-line summary for startup logging.
    pub fn summary(&self) -> String {
        format!(
            "camera {}x{}@{}fps, delta={}, min_area={}, motion_threshold={}, cooldown={}s, output={}",
            self.camera.width,
            self.camera.height,
            self.camera.framerate,
            self.detection.delta_threshold,
            self.detection.min_area,
            self.detection.motion_threshold,
            self.detection.cooldown_secs,
            self.storage.output_dir.display(),
        )
    }
}

/// Standard config file location, `$XDG_CONFIG_HOME/vigil/config.json`.
pub fn default_config_path() -> PathBuf {
    config_file_path()
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("vigil").join("config.json")
}

/// Default snapshot directory.
fn dirs_default_snapshots() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("vigil").join("snapshots")
}
