//! FFmpeg CLI wrapper and frame-level vision pipeline.
//!
//! This crate provides:
//! - FFmpeg command builder/runner (`cut`, `overlay_images`)
//! - Scoped per-frame video decode over OpenCV (`FrameReader`)
//! - ONNX person detection and pose estimation behind trait seams
//! - The lazy per-frame analysis stream (`VideoAnalyzer`)
//! - Command icon rasterization (`IconComposer`)

pub mod analyze;
pub mod clip;
pub mod command;
pub mod detection;
pub mod error;
pub mod frames;
pub mod icons;

pub use analyze::{select_target, AnalysisStream, VideoAnalyzer, MAX_PERSONS_PER_FRAME};
pub use clip::{cut, overlay_images, OVERLAY_HOLD_FRAMES};
pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use detection::{
    DetectPersons, EstimatePose, PersonDetector, PersonDetectorConfig, PoseEstimator,
    PoseEstimatorConfig,
};
pub use error::{MediaError, MediaResult};
pub use opencv::core::Mat;
pub use frames::{FrameReader, FrameSource};
pub use icons::IconComposer;
