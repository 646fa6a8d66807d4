//! Repository for the `activity_images` table.

use chrono::Utc;
use sqlx::types::Json;

use defectra_core::status::ImageStatus;
use defectra_core::types::{DbId, Timestamp};

use crate::models::activity_image::{ActivityImage, DetectionRow, ImageResult};
use crate::DbPool;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, activity_id, filename, status, detections, \
     high_defects, medium_defects, low_defects, original_url, annotated_url, created_at";

/// Provides CRUD and sync-processing operations for activity images.
pub struct ActivityImageRepo;

impl ActivityImageRepo {
    /// Insert a `processing` row for a newly discovered object, or return
    /// `None` if `(activity_id, filename)` already exists.
    ///
    /// The unique constraint makes this atomic under concurrent sync
    /// workers: the loser of a race sees `None` and skips the file, which
    /// is what keeps sync idempotent.
    pub async fn create_if_absent(
        pool: &DbPool,
        activity_id: &str,
        filename: &str,
        original_url: &str,
    ) -> Result<Option<ActivityImage>, sqlx::Error> {
        let query = format!(
            "INSERT INTO activity_images (activity_id, filename, status, original_url, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (activity_id, filename) DO NOTHING
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ActivityImage>(&query)
            .bind(activity_id)
            .bind(filename)
            .bind(ImageStatus::Processing.as_str())
            .bind(original_url)
            .bind(Utc::now())
            .fetch_optional(pool)
            .await
    }

    /// Persist a completed processing outcome: terminal status, verbatim
    /// detections, frozen severity counts, and the annotated URL (present
    /// iff defects were detected).
    pub async fn record_result(
        pool: &DbPool,
        id: DbId,
        result: &ImageResult,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE activity_images SET
                status = ?,
                detections = ?,
                high_defects = ?,
                medium_defects = ?,
                low_defects = ?,
                annotated_url = ?
             WHERE id = ?",
        )
        .bind(&result.status)
        .bind(Json(&result.detections))
        .bind(result.counts.high)
        .bind(result.counts.medium)
        .bind(result.counts.low)
        .bind(&result.annotated_url)
        .bind(id)
        .execute(pool)
        .await
        .map(|_| ())
    }

    /// Set only the status (used to mark per-image failures).
    pub async fn set_status(pool: &DbPool, id: DbId, status: ImageStatus) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE activity_images SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(pool)
            .await
            .map(|_| ())
    }

    /// List all images for an activity, newest first.
    pub async fn list_by_activity(
        pool: &DbPool,
        activity_id: &str,
    ) -> Result<Vec<ActivityImage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM activity_images
             WHERE activity_id = ?
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, ActivityImage>(&query)
            .bind(activity_id)
            .fetch_all(pool)
            .await
    }

    /// Status strings of every image owned by an activity.
    pub async fn list_statuses(
        pool: &DbPool,
        activity_id: &str,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT status FROM activity_images WHERE activity_id = ?")
            .bind(activity_id)
            .fetch_all(pool)
            .await
    }

    /// Total number of images across all activities.
    pub async fn count(pool: &DbPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM activity_images")
            .fetch_one(pool)
            .await
    }

    /// Detection projections for every stored image (analytics full scan).
    pub async fn list_detection_rows(pool: &DbPool) -> Result<Vec<DetectionRow>, sqlx::Error> {
        sqlx::query_as::<_, DetectionRow>(
            "SELECT activity_id, detections, created_at FROM activity_images",
        )
        .fetch_all(pool)
        .await
    }

    /// Detection projections for images created within the half-open
    /// window `[from, to)`.
    pub async fn list_detection_rows_between(
        pool: &DbPool,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<DetectionRow>, sqlx::Error> {
        sqlx::query_as::<_, DetectionRow>(
            "SELECT activity_id, detections, created_at FROM activity_images
             WHERE created_at >= ? AND created_at < ?",
        )
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await
    }
}
