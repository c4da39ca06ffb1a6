use serde::{Deserialize, Serialize};

/// A bounding box in frame pixel space.
///
/// Coordinates are `(x1, y1)` top-left to `(x2, y2)` bottom-right, produced
/// by person detection and consumed within a single frame only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// X coordinate of the left edge
    pub x1: f32,
    /// Y coordinate of the top edge
    pub y1: f32,
    /// X coordinate of the right edge
    pub x2: f32,
    /// Y coordinate of the bottom edge
    pub y2: f32,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Horizontal center of the box, used for screen-side selection.
    pub fn center_x(&self) -> f32 {
        (self.x1 + self.x2) / 2.0
    }

    /// Box width in pixels.
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    /// Box height in pixels.
    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Check if the box has positive extent.
    pub fn is_valid(&self) -> bool {
        self.x2 > self.x1 && self.y2 > self.y1
    }

    /// Clamp the box to the given frame dimensions.
    pub fn clamped(&self, frame_width: f32, frame_height: f32) -> Self {
        Self {
            x1: self.x1.clamp(0.0, frame_width),
            y1: self.y1.clamp(0.0, frame_height),
            x2: self.x2.clamp(0.0, frame_width),
            y2: self.y2.clamp(0.0, frame_height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_x() {
        let b = BoundingBox::new(10.0, 0.0, 30.0, 40.0);
        assert!((b.center_x() - 20.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_clamped() {
        let b = BoundingBox::new(-5.0, -5.0, 2000.0, 500.0).clamped(1920.0, 1080.0);
        assert_eq!(b.x1, 0.0);
        assert_eq!(b.x2, 1920.0);
        assert!(b.is_valid());
    }
}
