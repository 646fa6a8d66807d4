//! Detection result types produced by the external vision collaborator.
//!
//! A [`Detection`] is immutable once written: the sync orchestrator stores
//! the sequence verbatim on the image row, and analytics reclassifies the
//! same stored sequence under whatever thresholds are active at read time.

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in integer pixel coordinates, `x1 <= x2`
/// and `y1 <= y2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

/// One bounding-box classification result from the detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// 1-based index within the image's detection sequence.
    pub id: u32,
    /// Defect class label, e.g. `"patches"` or `"scratches"`.
    pub class: String,
    /// Confidence score, already normalized to `[0, 1]` by the detector.
    pub confidence: f64,
    pub bbox: BoundingBox,
}

/// Full output of one `detect` call.
#[derive(Debug, Clone, Default)]
pub struct DetectionOutput {
    pub detections: Vec<Detection>,
    /// Annotated render of the input, PNG bytes. Empty when the detector
    /// produced no overlay.
    pub annotated_image: Vec<u8>,
}

impl DetectionOutput {
    /// True when there is both at least one detection and an annotated
    /// render to publish.
    pub fn has_annotated_result(&self) -> bool {
        !self.detections.is_empty() && !self.annotated_image.is_empty()
    }
}
