//! Single-person pose estimation over an ONNX keypoint model.

use std::path::Path;
use std::sync::Mutex;

use opencv::core::{Mat, Rect};
use opencv::prelude::MatTraitConst;
use ort::session::Session;
use ort::value::Value;
use tracing::{debug, info};

use cmdclip_models::{pose::keypoint, BoundingBox, Keypoint, Pose};

use crate::error::{MediaError, MediaResult};

use super::{bgr_to_rgb, create_session, mat_to_chw_tensor, resize_square, EstimatePose};

/// Configuration for pose estimation.
#[derive(Debug, Clone)]
pub struct PoseEstimatorConfig {
    /// Path to the 17-keypoint ONNX model file
    pub model_path: String,
    /// Square model input size
    pub input_size: i32,
    /// Minimum mean keypoint score for a pose to count
    pub min_mean_score: f32,
}

impl Default for PoseEstimatorConfig {
    fn default() -> Self {
        Self {
            model_path: "models/pose_estimation/movenet_thunder.onnx".to_string(),
            input_size: 256,
            min_mean_score: 0.2,
        }
    }
}

impl PoseEstimatorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            model_path: std::env::var("POSE_MODEL_PATH").unwrap_or(default.model_path),
            ..default
        }
    }
}

/// Pose estimator over a single-person keypoint ONNX session.
///
/// The model contract is a COCO 17-keypoint single-person model taking a
/// `(1,3,S,S)` RGB tensor in `[0,1]` and returning `(1,17,3)` rows of
/// `(x, y, score)` normalized to the crop.
pub struct PoseEstimator {
    session: Mutex<Session>,
    config: PoseEstimatorConfig,
}

impl PoseEstimator {
    /// Create a new pose estimator from config.
    pub fn new(config: PoseEstimatorConfig) -> MediaResult<Self> {
        let session = Mutex::new(create_session(Path::new(&config.model_path))?);
        info!(
            model_path = %config.model_path,
            input_size = config.input_size,
            "Pose estimator initialized"
        );
        Ok(Self { session, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> MediaResult<Self> {
        Self::new(PoseEstimatorConfig::from_env())
    }

    fn run_inference(&self, input: Value) -> MediaResult<(Vec<i64>, Vec<f32>)> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| MediaError::detection_failed("ORT session poisoned"))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| MediaError::detection_failed(format!("ONNX inference failed: {e}")))?;

        let output = outputs
            .get("output")
            .ok_or_else(|| MediaError::detection_failed("Missing output tensor"))?;

        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| MediaError::detection_failed(format!("Failed to extract tensor: {e}")))?;

        Ok((shape.to_vec(), data.to_vec()))
    }
}

impl EstimatePose for PoseEstimator {
    fn estimate(&self, frame: &Mat, bbox: &BoundingBox) -> MediaResult<Vec<Pose>> {
        let size = frame
            .size()
            .map_err(|e| MediaError::detection_failed(format!("Mat size: {e}")))?;

        let crop = match crop_rect(bbox, size.width, size.height) {
            Some(rect) => rect,
            // Degenerate box: treat as "no pose", not a failure
            None => return Ok(Vec::new()),
        };

        let roi = Mat::roi(frame, crop)
            .map_err(|e| MediaError::detection_failed(format!("ROI failed: {e}")))?;
        let rgb = bgr_to_rgb(&roi)?;
        let resized = resize_square(&rgb, self.config.input_size)?;
        let input = mat_to_chw_tensor(&resized)?;

        let (shape, data) = self.run_inference(input)?;
        let keypoints = extract_keypoints(&shape, &data, &crop)?;

        let mean_score =
            keypoints.iter().map(|k| k.score).sum::<f32>() / keypoint::COUNT as f32;
        if mean_score < self.config.min_mean_score {
            debug!(mean_score, "Pose below score threshold, dropping");
            return Ok(Vec::new());
        }

        Ok(vec![Pose::new(keypoints)])
    }
}

/// Clamp a detection box to the frame and convert to an integer ROI.
///
/// Returns `None` for boxes too small to estimate on.
fn crop_rect(bbox: &BoundingBox, frame_w: i32, frame_h: i32) -> Option<Rect> {
    const MIN_SIDE: i32 = 8;

    let clamped = bbox.clamped(frame_w as f32, frame_h as f32);
    let x = clamped.x1.floor() as i32;
    let y = clamped.y1.floor() as i32;
    let w = (clamped.width().ceil() as i32).min(frame_w - x);
    let h = (clamped.height().ceil() as i32).min(frame_h - y);

    if w < MIN_SIDE || h < MIN_SIDE {
        return None;
    }

    Some(Rect::new(x, y, w, h))
}

/// Map `(1,17,3)` or `(17,3)` rows of crop-normalized `(x, y, score)` back
/// into frame pixel coordinates.
fn extract_keypoints(shape: &[i64], data: &[f32], crop: &Rect) -> MediaResult<Vec<Keypoint>> {
    let rows = match shape.len() {
        3 if shape[0] == 1 => (shape[1] as usize, shape[2] as usize),
        2 => (shape[0] as usize, shape[1] as usize),
        _ => {
            return Err(MediaError::detection_failed(format!(
                "Unexpected pose output shape: {:?}",
                shape
            )))
        }
    };

    let (points, stride) = rows;
    if points != keypoint::COUNT || stride < 3 || data.len() < points * stride {
        return Err(MediaError::detection_failed(format!(
            "Unexpected pose output layout: {:?}",
            shape
        )));
    }

    let mut keypoints = Vec::with_capacity(points);
    for i in 0..points {
        let base = i * stride;
        let nx = data[base];
        let ny = data[base + 1];
        let score = data[base + 2];

        keypoints.push(Keypoint::new(
            crop.x as f32 + nx * crop.width as f32,
            crop.y as f32 + ny * crop.height as f32,
            score,
        ));
    }

    Ok(keypoints)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_rect_rejects_degenerate_box() {
        let bbox = BoundingBox::new(10.0, 10.0, 12.0, 12.0);
        assert!(crop_rect(&bbox, 1920, 1080).is_none());
    }

    #[test]
    fn test_crop_rect_clamps_to_frame() {
        let bbox = BoundingBox::new(-50.0, -50.0, 300.0, 300.0);
        let rect = crop_rect(&bbox, 200, 200).unwrap();
        assert_eq!(rect.x, 0);
        assert_eq!(rect.y, 0);
        assert_eq!(rect.width, 200);
        assert_eq!(rect.height, 200);
    }

    #[test]
    fn test_extract_keypoints_maps_to_frame_space() {
        let crop = Rect::new(100, 50, 200, 400);
        let mut data = vec![0.0f32; keypoint::COUNT * 3];
        // keypoint 0 at crop center with score 0.9
        data[0] = 0.5;
        data[1] = 0.5;
        data[2] = 0.9;

        let shape = vec![1i64, keypoint::COUNT as i64, 3];
        let keypoints = extract_keypoints(&shape, &data, &crop).unwrap();
        assert_eq!(keypoints.len(), keypoint::COUNT);
        assert!((keypoints[0].x - 200.0).abs() < 1e-4);
        assert!((keypoints[0].y - 250.0).abs() < 1e-4);
        assert!((keypoints[0].score - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_extract_keypoints_rejects_bad_shape() {
        let crop = Rect::new(0, 0, 10, 10);
        let err = extract_keypoints(&[4, 4], &vec![0.0; 16], &crop);
        assert!(err.is_err());
    }
}
