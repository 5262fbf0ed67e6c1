//! Error types shared across Vigil crates.

use std::path::PathBuf;

/// Top-level error type for Vigil operations.
#[derive(Debug, thiserror::Error)]
pub enum VigilError {
    #[error("Capture error: {message}")]
    Capture { message: String },

    #[error("Detection error: {message}")]
    Detection { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A frame's size disagrees with the background model's established
    /// size. Fatal for the run; the background must be reset explicitly
    /// before continuing.
    #[error("Frame dimensions {actual_width}x{actual_height} do not match background {expected_width}x{expected_height}")]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    /// A single frame could not be decoded or preprocessed. Recovered
    /// locally: the tick is skipped and the background stays unchanged.
    #[error("Transient frame error: {message}")]
    TransientFrame { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using VigilError.
pub type VigilResult<T> = Result<T, VigilError>;

impl VigilError {
    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture {
            message: msg.into(),
        }
    }

    pub fn detection(msg: impl Into<String>) -> Self {
        Self::Detection {
            message: msg.into(),
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn transient_frame(msg: impl Into<String>) -> Self {
        Self::TransientFrame {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether this error should be absorbed as a skipped tick rather
    /// than surfaced to the run loop.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientFrame { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_message_names_both_sizes() {
        let err = VigilError::DimensionMismatch {
            expected_width: 640,
            expected_height: 480,
            actual_width: 1280,
            actual_height: 720,
        };
        let msg = err.to_string();
        assert!(msg.contains("1280x720"));
        assert!(msg.contains("640x480"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(VigilError::transient_frame("short buffer").is_transient());
        assert!(!VigilError::capture("device lost").is_transient());
        assert!(!VigilError::config("bad kernel").is_transient());
    }
}
