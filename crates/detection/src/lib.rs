//! Vigil Detection Core
//!
//! Classic background-subtraction motion detection with deterministic,
//! explainable thresholds. The pipeline per tick:
//!
//! 1. [`frame::preprocess`] — grayscale + Gaussian blur of the incoming frame
//! 2. [`MotionAnalyzer::detect`] — diff against the [`BackgroundModel`],
//!    threshold, morphology, connected components, two-stage area filter
//! 3. [`MotionGate::admit`] — rate-limits per-frame motion into discrete
//!    [`MotionEvent`]s
//! 4. [`BackgroundModel::update`] — exponential moving average toward the
//!    current frame, run every tick regardless of the detection outcome
//!
//! The core owns no I/O. Frames come from a `FrameSource` collaborator and
//! admitted events go to an [`EventSink`] collaborator; both live outside
//! this crate.

pub mod analyzer;
pub mod background;
pub mod config;
pub mod frame;
pub mod gate;
pub mod sink;

pub use analyzer::{annotate_regions, Detection, MotionAnalyzer, Region};
pub use background::BackgroundModel;
pub use config::DetectionConfig;
pub use frame::RawFrame;
pub use gate::{MotionEvent, MotionGate};
pub use sink::EventSink;
