//! Person detection and pose estimation over ONNX Runtime.
//!
//! Both models are loaded once at worker startup and shared across jobs;
//! inference is synchronized through an internal session mutex so the
//! instances are safe for concurrent use.

pub mod person;
pub mod pose;

use std::path::Path;

use opencv::core::{Mat, ToInputArray};
use opencv::imgproc;
use opencv::prelude::{MatTraitConst, MatTraitConstManual};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};

use cmdclip_models::{BoundingBox, Pose};

use crate::error::{MediaError, MediaResult};

pub use person::{PersonDetector, PersonDetectorConfig};
pub use pose::{PoseEstimator, PoseEstimatorConfig};

/// Person detection capability: frame in, candidate boxes out.
pub trait DetectPersons: Send + Sync {
    /// Detect up to `max_persons` people in a BGR frame, ranked by
    /// confidence, with boxes in frame pixel space.
    fn detect(&self, frame: &Mat, max_persons: usize) -> MediaResult<Vec<BoundingBox>>;
}

/// Pose estimation capability: frame plus box in, poses out.
pub trait EstimatePose: Send + Sync {
    /// Estimate poses for the subject inside `bbox`. An empty result means
    /// no usable pose, which is not an error.
    fn estimate(&self, frame: &Mat, bbox: &BoundingBox) -> MediaResult<Vec<Pose>>;
}

/// Load an ONNX model into an ORT session.
pub(crate) fn create_session(model_path: &Path) -> MediaResult<Session> {
    if !model_path.exists() {
        return Err(MediaError::model_not_found(
            model_path.to_string_lossy().to_string(),
        ));
    }

    let model_bytes = std::fs::read(model_path)
        .map_err(|e| MediaError::detection_failed(format!("ORT read model file: {e}")))?;

    Session::builder()
        .map_err(|e| MediaError::detection_failed(format!("ORT session builder: {e}")))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| MediaError::detection_failed(format!("ORT opt level: {e}")))?
        .commit_from_memory(model_bytes.as_slice())
        .map_err(|e| MediaError::detection_failed(format!("ORT load model: {e}")))
}

/// Convert a BGR Mat to RGB.
pub(crate) fn bgr_to_rgb(frame_bgr: &impl ToInputArray) -> MediaResult<Mat> {
    let mut rgb = Mat::default();
    imgproc::cvt_color(frame_bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0)
        .map_err(|e| MediaError::detection_failed(format!("BGR2RGB failed: {e}")))?;
    Ok(rgb)
}

/// Resize an RGB Mat to a square model input.
pub(crate) fn resize_square(rgb: &Mat, size: i32) -> MediaResult<Mat> {
    let mut resized = Mat::default();
    imgproc::resize(
        rgb,
        &mut resized,
        opencv::core::Size::new(size, size),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )
    .map_err(|e| MediaError::detection_failed(format!("Resize failed: {e}")))?;
    Ok(resized)
}

/// Convert an RGB Mat (HxWx3, u8) to an ORT tensor (1,3,H,W) in [0,1].
pub(crate) fn mat_to_chw_tensor(mat_rgb: &Mat) -> MediaResult<Value> {
    let size = mat_rgb
        .size()
        .map_err(|e| MediaError::detection_failed(format!("Mat size: {e}")))?;
    let (h, w) = (size.height, size.width);
    if mat_rgb.channels() != 3 {
        return Err(MediaError::detection_failed("Expected 3-channel RGB Mat"));
    }

    let data = mat_rgb
        .data_typed::<u8>()
        .map_err(|e| MediaError::detection_failed(format!("Mat data: {e}")))?;

    let mut chw = Vec::with_capacity((h * w * 3) as usize);
    // HWC -> CHW
    for c in 0..3 {
        for y in 0..h {
            for x in 0..w {
                let idx = (y * w * 3 + x * 3 + c) as usize;
                chw.push(data[idx] as f32 / 255.0);
            }
        }
    }

    let shape = vec![1usize, 3, h as usize, w as usize];
    Tensor::from_array((shape, chw.into_boxed_slice()))
        .map(Value::from)
        .map_err(|e| MediaError::detection_failed(format!("ORT tensor: {e}")))
}
