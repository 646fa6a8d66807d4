//! Repository for the `activities` table.

use chrono::Utc;
use uuid::Uuid;

use defectra_core::status::ActivityStatus;

use crate::models::activity::{Activity, CreateActivity};
use crate::DbPool;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, status, from_value, to_value, created_at";

/// Provides CRUD operations for activities.
pub struct ActivityRepo;

impl ActivityRepo {
    /// Insert a new activity with a generated UUID and `pending` status,
    /// returning the created row.
    pub async fn create(pool: &DbPool, input: &CreateActivity) -> Result<Activity, sqlx::Error> {
        let query = format!(
            "INSERT INTO activities (id, name, status, from_value, to_value, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Activity>(&query)
            .bind(Uuid::new_v4().to_string())
            .bind(&input.name)
            .bind(ActivityStatus::Pending.as_str())
            .bind(&input.from_value)
            .bind(&input.to_value)
            .bind(Utc::now())
            .fetch_one(pool)
            .await
    }

    /// Find an activity by its ID.
    pub async fn find_by_id(pool: &DbPool, id: &str) -> Result<Option<Activity>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM activities WHERE id = ?");
        sqlx::query_as::<_, Activity>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all activities, most recently created first.
    pub async fn list(pool: &DbPool) -> Result<Vec<Activity>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM activities ORDER BY created_at DESC, id DESC");
        sqlx::query_as::<_, Activity>(&query).fetch_all(pool).await
    }

    /// Total number of activities.
    pub async fn count(pool: &DbPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM activities")
            .fetch_one(pool)
            .await
    }

    /// Overwrite the derived status. Only the sync orchestrator calls this.
    pub async fn set_status(
        pool: &DbPool,
        id: &str,
        status: ActivityStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE activities SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(pool)
            .await
            .map(|_| ())
    }

    /// Delete an activity by ID, cascading to its images. Returns `true`
    /// if a row was removed.
    pub async fn delete(pool: &DbPool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM activities WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
