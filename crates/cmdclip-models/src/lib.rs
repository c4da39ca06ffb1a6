//! Shared data models for the cmdclip backend.
//!
//! This crate provides Serde-serializable types for:
//! - Queue message bodies (job requests and results)
//! - Frame-space bounding boxes and poses
//! - Motion commands and their input primitives
//! - Per-frame analysis results and overlay timeline entries

pub mod analysis;
pub mod command;
pub mod job;
pub mod pose;
pub mod rect;
pub mod side;

// Re-export common types
pub use analysis::{FrameAnalysis, OverlayEntry};
pub use command::{Command, Input};
pub use job::{JobResult, ProcessVideoJob, ORIGINAL_PREFIX, PROCESSED_PREFIX};
pub use pose::{Keypoint, Pose};
pub use rect::BoundingBox;
pub use side::Side;
