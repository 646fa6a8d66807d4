//! Activity-image entity model and per-sync result DTOs.

use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

use defectra_core::detection::Detection;
use defectra_core::severity::SeverityCounts;
use defectra_core::types::{ActivityId, DbId, Timestamp};

/// A row from the `activity_images` table.
///
/// `detections` is the sequence produced by the detector at sync time,
/// stored verbatim; the `*_defects` columns are severity counts frozen
/// under the thresholds in effect during that sync run. The two may
/// diverge from a later reclassification under updated thresholds --
/// that divergence is intentional and analytics never reads the frozen
/// columns.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ActivityImage {
    pub id: DbId,
    pub activity_id: ActivityId,
    pub filename: String,
    pub status: String,
    pub detections: Json<Vec<Detection>>,
    pub high_defects: i64,
    pub medium_defects: i64,
    pub low_defects: i64,
    pub original_url: Option<String>,
    pub annotated_url: Option<String>,
    pub created_at: Timestamp,
}

impl ActivityImage {
    /// The frozen severity counts written at sync time.
    pub fn frozen_counts(&self) -> SeverityCounts {
        SeverityCounts {
            low: self.low_defects,
            medium: self.medium_defects,
            high: self.high_defects,
        }
    }
}

/// Processing outcome persisted after an image completes detection.
#[derive(Debug, Clone)]
pub struct ImageResult {
    pub status: String,
    pub detections: Vec<Detection>,
    pub counts: SeverityCounts,
    pub annotated_url: Option<String>,
}

/// Projection used by analytics: just enough to reclassify every stored
/// detection set without dragging full rows around.
#[derive(Debug, Clone, FromRow)]
pub struct DetectionRow {
    pub activity_id: ActivityId,
    pub detections: Json<Vec<Detection>>,
    pub created_at: Timestamp,
}
