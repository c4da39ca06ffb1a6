//! Person detection using a YOLOv8 ONNX model.

use std::path::Path;
use std::sync::Mutex;

use ndarray::Array;
use opencv::core::Mat;
use opencv::prelude::MatTraitConst;
use ort::session::Session;
use ort::value::Value;
use tracing::{debug, info};

use cmdclip_models::BoundingBox;

use crate::error::{MediaError, MediaResult};

use super::{bgr_to_rgb, create_session, mat_to_chw_tensor, resize_square, DetectPersons};

/// COCO class id for "person".
const PERSON_CLASS: usize = 0;

/// Configuration for person detection.
#[derive(Debug, Clone)]
pub struct PersonDetectorConfig {
    /// Path to the YOLOv8 ONNX model file
    pub model_path: String,
    /// Confidence threshold for detections
    pub confidence_threshold: f32,
    /// IoU threshold for NMS
    pub nms_threshold: f32,
    /// Square model input size
    pub input_size: i32,
}

impl Default for PersonDetectorConfig {
    fn default() -> Self {
        Self {
            model_path: "models/person_detection/yolov8n.onnx".to_string(),
            confidence_threshold: 0.25,
            nms_threshold: 0.45,
            input_size: 640,
        }
    }
}

impl PersonDetectorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            model_path: std::env::var("PERSON_MODEL_PATH").unwrap_or(default.model_path),
            ..default
        }
    }
}

/// Person detector over a YOLOv8 ONNX session.
pub struct PersonDetector {
    session: Mutex<Session>,
    config: PersonDetectorConfig,
}

impl PersonDetector {
    /// Create a new person detector from config.
    ///
    /// Returns an error if the model file is missing or cannot be loaded.
    pub fn new(config: PersonDetectorConfig) -> MediaResult<Self> {
        let session = Mutex::new(create_session(Path::new(&config.model_path))?);
        info!(
            model_path = %config.model_path,
            input_size = config.input_size,
            "Person detector initialized"
        );
        Ok(Self { session, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> MediaResult<Self> {
        Self::new(PersonDetectorConfig::from_env())
    }

    fn run_inference(&self, input: Value) -> MediaResult<Vec<f32>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| MediaError::detection_failed("ORT session poisoned"))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| MediaError::detection_failed(format!("ONNX inference failed: {e}")))?;

        let output = outputs
            .get("output0")
            .ok_or_else(|| MediaError::detection_failed("Missing output0 tensor"))?;

        let tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| MediaError::detection_failed(format!("Failed to extract tensor: {e}")))?;

        Ok(tensor.1.iter().copied().collect())
    }

    /// Parse YOLOv8 output `[1, 84, 8400]` into person boxes in frame pixels.
    fn postprocess(
        &self,
        outputs: &[f32],
        orig_width: f32,
        orig_height: f32,
    ) -> MediaResult<Vec<(BoundingBox, f32)>> {
        let num_classes = 80;
        let num_boxes = 8400;
        let num_features = 4 + num_classes;

        if outputs.len() != num_features * num_boxes {
            return Err(MediaError::detection_failed(format!(
                "Unexpected output size: expected {}, got {}",
                num_features * num_boxes,
                outputs.len()
            )));
        }

        let output_array = Array::from_shape_vec((num_features, num_boxes), outputs.to_vec())
            .map_err(|e| MediaError::detection_failed(format!("Failed to reshape output: {e}")))?;
        let transposed = output_array.t();

        let input_size = self.config.input_size as f32;
        let scale_w = orig_width / input_size;
        let scale_h = orig_height / input_size;

        let mut candidates: Vec<(BoundingBox, f32)> = Vec::new();

        for i in 0..num_boxes {
            let score = transposed[[i, 4 + PERSON_CLASS]];
            if score < self.config.confidence_threshold {
                continue;
            }

            let cx = transposed[[i, 0]];
            let cy = transposed[[i, 1]];
            let w = transposed[[i, 2]];
            let h = transposed[[i, 3]];

            let bbox = BoundingBox::new(
                (cx - w / 2.0) * scale_w,
                (cy - h / 2.0) * scale_h,
                (cx + w / 2.0) * scale_w,
                (cy + h / 2.0) * scale_h,
            )
            .clamped(orig_width, orig_height);

            if bbox.is_valid() {
                candidates.push((bbox, score));
            }
        }

        Ok(non_maximum_suppression(
            candidates,
            self.config.nms_threshold,
        ))
    }
}

impl DetectPersons for PersonDetector {
    fn detect(&self, frame: &Mat, max_persons: usize) -> MediaResult<Vec<BoundingBox>> {
        let size = frame
            .size()
            .map_err(|e| MediaError::detection_failed(format!("Mat size: {e}")))?;
        let (orig_w, orig_h) = (size.width as f32, size.height as f32);

        let rgb = bgr_to_rgb(frame)?;
        let resized = resize_square(&rgb, self.config.input_size)?;
        let input = mat_to_chw_tensor(&resized)?;

        let outputs = self.run_inference(input)?;
        let mut detections = self.postprocess(&outputs, orig_w, orig_h)?;

        // NMS already sorted by confidence, keep the strongest candidates
        detections.truncate(max_persons);

        debug!(count = detections.len(), "Person detection completed");
        Ok(detections.into_iter().map(|(bbox, _)| bbox).collect())
    }
}

/// Apply Non-Maximum Suppression to remove overlapping detections.
///
/// Returns the kept detections sorted by confidence (descending).
fn non_maximum_suppression(
    mut detections: Vec<(BoundingBox, f32)>,
    nms_threshold: f32,
) -> Vec<(BoundingBox, f32)> {
    if detections.is_empty() {
        return detections;
    }

    detections.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut keep = Vec::new();
    let mut suppressed = vec![false; detections.len()];

    for i in 0..detections.len() {
        if suppressed[i] {
            continue;
        }

        keep.push(detections[i]);

        for j in (i + 1)..detections.len() {
            if !suppressed[j] && compute_iou(&detections[i].0, &detections[j].0) > nms_threshold {
                suppressed[j] = true;
            }
        }
    }

    keep
}

/// Compute Intersection over Union between two boxes.
fn compute_iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.width() * a.height() + b.width() * b.height() - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iou_disjoint() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(20.0, 20.0, 30.0, 30.0);
        assert_eq!(compute_iou(&a, &b), 0.0);
    }

    #[test]
    fn test_iou_identical() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!((compute_iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_nms_suppresses_overlap_and_sorts() {
        let detections = vec![
            (BoundingBox::new(0.0, 0.0, 10.0, 10.0), 0.5),
            (BoundingBox::new(1.0, 1.0, 11.0, 11.0), 0.9),
            (BoundingBox::new(50.0, 50.0, 60.0, 60.0), 0.7),
        ];
        let kept = non_maximum_suppression(detections, 0.45);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].1, 0.9);
        assert_eq!(kept[1].1, 0.7);
    }
}
