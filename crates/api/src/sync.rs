//! The sync orchestrator.
//!
//! Reconciles an activity's image set against the objects under the
//! `original/` prefix, drives each new object through detection, freezes
//! its severity counts under the thresholds in effect at run start, and
//! recomputes the activity's derived status.
//!
//! Failure semantics: a listing failure is fatal to the whole run (the
//! activity is marked `error`, no image rows are created); any failure
//! while processing a single image -- download, detection, upload,
//! persistence, or timeout -- is caught, marks only that image `error`,
//! and never aborts the batch.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;

use defectra_core::error::CoreError;
use defectra_core::severity::{self, Thresholds};
use defectra_core::status::{ActivityStatus, ImageStatus};
use defectra_core::types::DbId;
use defectra_db::models::activity_image::ImageResult;
use defectra_db::repositories::{ActivityImageRepo, ActivityRepo};
use defectra_storage::{annotated_key, filename_of, ORIGINAL_PREFIX};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Outcome of one sync run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub message: String,
    pub activity_status: String,
    pub new_images_found: u32,
    pub processed_images: u32,
    pub error_images: u32,
}

/// Exclusive claim on an activity's slot in the in-flight set.
///
/// Released on drop, never by straight-line code: a run future dropped
/// mid-flight (client disconnect, request timeout) must free the slot or
/// every later sync of that activity would 409 until process restart.
struct SyncPermit {
    slots: Arc<Mutex<HashSet<String>>>,
    activity_id: String,
}

impl SyncPermit {
    /// Claim the slot for `activity_id`, or `None` if a run holds it.
    fn acquire(slots: &Arc<Mutex<HashSet<String>>>, activity_id: &str) -> Option<Self> {
        let mut held = slots.lock().unwrap_or_else(|e| e.into_inner());
        if held.insert(activity_id.to_string()) {
            Some(SyncPermit {
                slots: Arc::clone(slots),
                activity_id: activity_id.to_string(),
            })
        } else {
            None
        }
    }
}

impl Drop for SyncPermit {
    fn drop(&mut self) {
        self.slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.activity_id);
    }
}

/// Synchronize one activity against the object store.
///
/// Re-running against an unchanged object set is a no-op
/// (`new_images_found = 0`): `(activity_id, filename)` uniqueness is
/// enforced by the persistence layer, so discovery never duplicates rows.
/// A second call while a run is in flight for the same activity is
/// rejected with a conflict.
pub async fn run_sync(state: &AppState, activity_id: &str) -> AppResult<SyncReport> {
    let activity = ActivityRepo::find_by_id(&state.pool, activity_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Activity", activity_id)))?;

    let _permit = SyncPermit::acquire(&state.sync_guard, &activity.id).ok_or_else(|| {
        AppError::Core(CoreError::Conflict(format!(
            "A sync is already running for activity {activity_id}"
        )))
    })?;

    run_locked(state, &activity.id).await
}

async fn run_locked(state: &AppState, activity_id: &str) -> AppResult<SyncReport> {
    // Thresholds are read once here and applied uniformly across the run.
    let thresholds = state.thresholds.get()?.thresholds;

    ActivityRepo::set_status(&state.pool, activity_id, ActivityStatus::InProgress).await?;

    let keys = match state.store.list(ORIGINAL_PREFIX).await {
        Ok(keys) => keys,
        Err(e) => {
            // Discovery failure is fatal to the run: no image rows exist
            // yet, so marking the activity `error` is the whole cleanup.
            state.audit.record(&format!(
                "Failed to list objects for activity {activity_id}; Error: {e}"
            ));
            ActivityRepo::set_status(&state.pool, activity_id, ActivityStatus::Error).await?;
            return Err(AppError::Core(CoreError::Upstream(e.to_string())));
        }
    };

    let mut new_images_found = 0u32;
    let mut processed_images = 0u32;
    let mut error_images = 0u32;

    for key in &keys {
        let filename = filename_of(key);
        if filename.is_empty() {
            // Prefix placeholder objects ("original/") carry no filename.
            continue;
        }

        let original_url = state.store.url(key);
        let Some(image) =
            ActivityImageRepo::create_if_absent(&state.pool, activity_id, filename, &original_url)
                .await?
        else {
            // Already synced in a prior run (or claimed by a concurrent
            // worker of this run); skip.
            continue;
        };
        new_images_found += 1;

        let budget = Duration::from_secs(state.config.detection_timeout_secs);
        let outcome =
            tokio::time::timeout(budget, process_image(state, key, filename, &thresholds)).await;

        match outcome {
            Ok(Ok(result)) => {
                match ActivityImageRepo::record_result(&state.pool, image.id, &result).await {
                    Ok(()) => processed_images += 1,
                    Err(e) => {
                        mark_image_error(state, image.id, filename, activity_id, &e.to_string())
                            .await;
                        error_images += 1;
                    }
                }
            }
            Ok(Err(e)) => {
                mark_image_error(state, image.id, filename, activity_id, &e.to_string()).await;
                error_images += 1;
            }
            Err(_elapsed) => {
                mark_image_error(
                    state,
                    image.id,
                    filename,
                    activity_id,
                    &format!("processing exceeded {}s budget", budget.as_secs()),
                )
                .await;
                error_images += 1;
            }
        }
    }

    // Recompute the derived activity status from the full image multiset,
    // including rows from prior runs.
    let stored_statuses = ActivityImageRepo::list_statuses(&state.pool, activity_id).await?;
    let statuses: Vec<ImageStatus> = stored_statuses
        .iter()
        .map(|s| match ImageStatus::parse(s) {
            Some(status) => status,
            None => {
                // A corrupted row reads as unresolved work, so it can
                // never flip the activity to completed.
                tracing::warn!(activity_id, status = %s, "Unknown stored image status");
                ImageStatus::Pending
            }
        })
        .collect();
    let final_status = ActivityStatus::derive(error_images, &statuses);
    ActivityRepo::set_status(&state.pool, activity_id, final_status).await?;

    state
        .audit
        .record(&format!("Sync completed for activity {activity_id}"));

    Ok(SyncReport {
        message: "Sync complete".to_string(),
        activity_status: final_status.as_str().to_string(),
        new_images_found,
        processed_images,
        error_images,
    })
}

/// Drive a single image through download, detection, classification, and
/// (when defective) annotated upload. Every error path is the caller's
/// per-image failure; nothing here touches other images' rows.
async fn process_image(
    state: &AppState,
    key: &str,
    filename: &str,
    thresholds: &Thresholds,
) -> AppResult<ImageResult> {
    let bytes = state.store.get(key).await?;

    let output = state
        .detector
        .detect(&bytes)
        .await
        .map_err(|e| AppError::Core(CoreError::Detection(e.to_string())))?;

    let counts = severity::count_detections(&output.detections, thresholds);

    let (status, annotated_url) = if output.has_annotated_result() {
        let url = state
            .store
            .put(&annotated_key(filename), output.annotated_image, "image/png")
            .await?;
        (ImageStatus::DefectsDetected, Some(url))
    } else {
        (ImageStatus::NoDefects, None)
    };

    Ok(ImageResult {
        status: status.as_str().to_string(),
        detections: output.detections,
        counts,
        annotated_url,
    })
}

/// Record a per-image failure: audit it and move the row to `error`.
/// The status write itself is best-effort; a failure there is logged and
/// the run continues.
async fn mark_image_error(
    state: &AppState,
    image_id: DbId,
    filename: &str,
    activity_id: &str,
    reason: &str,
) {
    tracing::warn!(activity_id, filename, error = %reason, "Image sync failed");
    state.audit.record(&format!(
        "Sync error {reason} for {filename} in activity {activity_id}"
    ));
    if let Err(e) = ActivityImageRepo::set_status(&state.pool, image_id, ImageStatus::Error).await {
        tracing::error!(activity_id, filename, error = %e, "Failed to mark image as errored");
    }
}
