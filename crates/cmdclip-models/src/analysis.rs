//! Per-frame analysis output and the overlay timeline.

use std::path::PathBuf;

use crate::command::Command;

/// Result of analyzing a single video frame.
///
/// Produced one per decodable frame in strictly increasing `frame_idx`
/// order, then consumed immediately by the overlay accumulator.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameAnalysis {
    /// Zero-based frame index within the trimmed clip
    pub frame_idx: u64,
    /// Command recognized at this frame, if any
    pub command: Option<Command>,
}

/// One entry of a job's overlay timeline.
///
/// Points at a rendered icon image inside the job workspace. Entries are
/// accumulated in frame order; the full sequence is handed to the render
/// stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayEntry {
    /// Frame index at which the icon appears
    pub frame: u64,
    /// Path to the rasterized icon image
    pub image: PathBuf,
}

impl OverlayEntry {
    pub fn new(frame: u64, image: impl Into<PathBuf>) -> Self {
        Self {
            frame,
            image: image.into(),
        }
    }
}
