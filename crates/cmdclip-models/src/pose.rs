//! Per-subject pose estimation results.
//!
//! Poses use the COCO 17-keypoint layout. A pose is attached to exactly one
//! bounding box for exactly one frame and is consumed immediately by the
//! motion recognizer; it is never persisted.

use serde::{Deserialize, Serialize};

/// Named indices into [`Pose::keypoints`] (COCO ordering).
pub mod keypoint {
    pub const NOSE: usize = 0;
    pub const LEFT_EYE: usize = 1;
    pub const RIGHT_EYE: usize = 2;
    pub const LEFT_EAR: usize = 3;
    pub const RIGHT_EAR: usize = 4;
    pub const LEFT_SHOULDER: usize = 5;
    pub const RIGHT_SHOULDER: usize = 6;
    pub const LEFT_ELBOW: usize = 7;
    pub const RIGHT_ELBOW: usize = 8;
    pub const LEFT_WRIST: usize = 9;
    pub const RIGHT_WRIST: usize = 10;
    pub const LEFT_HIP: usize = 11;
    pub const RIGHT_HIP: usize = 12;
    pub const LEFT_KNEE: usize = 13;
    pub const RIGHT_KNEE: usize = 14;
    pub const LEFT_ANKLE: usize = 15;
    pub const RIGHT_ANKLE: usize = 16;

    /// Total number of keypoints in the COCO layout.
    pub const COUNT: usize = 17;
}

/// A single estimated keypoint in frame pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// Estimation confidence in `[0, 1]`
    pub score: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, score: f32) -> Self {
        Self { x, y, score }
    }
}

/// A structured pose result for one subject in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Keypoints in COCO order; always [`keypoint::COUNT`] entries.
    pub keypoints: Vec<Keypoint>,
}

impl Pose {
    /// Create a pose from a full keypoint set.
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        debug_assert_eq!(keypoints.len(), keypoint::COUNT);
        Self { keypoints }
    }

    /// Get a keypoint by COCO index, if present.
    pub fn keypoint(&self, index: usize) -> Option<&Keypoint> {
        self.keypoints.get(index)
    }

    /// Midpoint of the two shoulders, if both are present.
    pub fn shoulder_center(&self) -> Option<(f32, f32)> {
        let l = self.keypoint(keypoint::LEFT_SHOULDER)?;
        let r = self.keypoint(keypoint::RIGHT_SHOULDER)?;
        Some(((l.x + r.x) / 2.0, (l.y + r.y) / 2.0))
    }

    /// Midpoint of the two hips, if both are present.
    pub fn hip_center(&self) -> Option<(f32, f32)> {
        let l = self.keypoint(keypoint::LEFT_HIP)?;
        let r = self.keypoint(keypoint::RIGHT_HIP)?;
        Some(((l.x + r.x) / 2.0, (l.y + r.y) / 2.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_pose(x: f32, y: f32) -> Pose {
        Pose::new(vec![Keypoint::new(x, y, 1.0); keypoint::COUNT])
    }

    #[test]
    fn test_centers() {
        let pose = uniform_pose(10.0, 20.0);
        assert_eq!(pose.shoulder_center(), Some((10.0, 20.0)));
        assert_eq!(pose.hip_center(), Some((10.0, 20.0)));
    }

    #[test]
    fn test_keypoint_out_of_range() {
        let pose = uniform_pose(0.0, 0.0);
        assert!(pose.keypoint(keypoint::COUNT).is_none());
    }
}
