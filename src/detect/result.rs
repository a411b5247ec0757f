use serde::{Deserialize, Serialize};

/// One detected object, as produced by a detector backend.
///
/// Coordinates are corner pixels (`x1,y1` top-left, `x2,y2` bottom-right). Backends
/// report them in detector-input space; the coordinate normalizer maps them into
/// original-frame space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: u32,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
}

impl Detection {
    pub fn new(class_id: u32, x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> Self {
        Self {
            class_id,
            x1,
            y1,
            x2,
            y2,
            score,
        }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Intersection over union with another box.
    pub fn iou(&self, other: &Detection) -> f32 {
        let ix = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let iy = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let inter = ix * iy;
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}
