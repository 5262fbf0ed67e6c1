//! Vigil Common Utilities
//!
//! Shared infrastructure for all Vigil crates:
//! - Error types and result aliases
//! - Monotonic clock utilities for frame timestamping
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
