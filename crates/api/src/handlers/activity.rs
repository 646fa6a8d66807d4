//! Handlers for the `/activities` resource and the `/images` upload.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use defectra_core::detection::Detection;
use defectra_core::error::CoreError;
use defectra_core::severity::SeverityCounts;
use defectra_core::types::{DbId, Timestamp};
use defectra_db::models::activity::{Activity, CreateActivity};
use defectra_db::models::activity_image::ActivityImage;
use defectra_db::repositories::{ActivityImageRepo, ActivityRepo};
use defectra_storage::{annotated_key, original_key, ORIGINAL_PREFIX};

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::sync::{run_sync, SyncReport};

/// An activity with its images nested, newest image first.
#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub id: String,
    pub name: String,
    pub status: String,
    pub from_value: Option<String>,
    pub to_value: Option<String>,
    pub created_at: Timestamp,
    pub images: Vec<ImageResponse>,
}

#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub id: DbId,
    pub filename: String,
    pub status: String,
    pub original_url: Option<String>,
    pub annotated_url: Option<String>,
    pub created_at: Timestamp,
}

impl ImageResponse {
    fn from_row(row: ActivityImage) -> Self {
        Self {
            id: row.id,
            filename: row.filename,
            status: row.status,
            original_url: row.original_url,
            annotated_url: row.annotated_url,
            created_at: row.created_at,
        }
    }
}

impl ActivityResponse {
    fn assemble(activity: Activity, images: Vec<ActivityImage>) -> Self {
        Self {
            id: activity.id,
            name: activity.name,
            status: activity.status,
            from_value: activity.from_value,
            to_value: activity.to_value,
            created_at: activity.created_at,
            images: images.into_iter().map(ImageResponse::from_row).collect(),
        }
    }
}

/// Frozen-count rollup for one activity: sums of the per-image severity
/// columns as written at sync time, plus the defective images with their
/// raw detections.
#[derive(Debug, Serialize)]
pub struct ActivitySummary {
    pub activity_id: String,
    pub activity_status: String,
    pub high_defects: i64,
    pub medium_defects: i64,
    pub low_defects: i64,
    pub defect_images: Vec<DefectImage>,
}

#[derive(Debug, Serialize)]
pub struct DefectImage {
    pub filename: String,
    pub original_url: Option<String>,
    pub annotated_url: Option<String>,
    pub detections: Vec<Detection>,
}

/// POST /api/v1/activities
///
/// The name is trimmed; an empty or whitespace-only name is rejected.
pub async fn create(
    State(state): State<AppState>,
    Json(mut input): Json<CreateActivity>,
) -> AppResult<(StatusCode, Json<Value>)> {
    input.name = input.name.trim().to_string();
    if input.name.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Activity name is required".to_string(),
        )));
    }

    let activity = ActivityRepo::create(&state.pool, &input).await?;
    state
        .audit
        .record(&format!("Created activity: {}", activity.name));

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Activity created",
            "activity_id": activity.id,
        })),
    ))
}

/// GET /api/v1/activities
pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<ActivityResponse>>> {
    let activities = ActivityRepo::list(&state.pool).await?;
    let mut out = Vec::with_capacity(activities.len());
    for activity in activities {
        let images = ActivityImageRepo::list_by_activity(&state.pool, &activity.id).await?;
        out.push(ActivityResponse::assemble(activity, images));
    }
    Ok(Json(out))
}

/// GET /api/v1/activities/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ActivityResponse>> {
    let activity = ActivityRepo::find_by_id(&state.pool, &id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Activity", &id)))?;
    let images = ActivityImageRepo::list_by_activity(&state.pool, &id).await?;
    Ok(Json(ActivityResponse::assemble(activity, images)))
}

/// POST /api/v1/activities/{id}/sync
pub async fn sync(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<SyncReport>> {
    let report = run_sync(&state, &id).await?;
    Ok(Json(report))
}

/// GET /api/v1/activities/{id}/summary
///
/// Reads only the frozen severity columns; analytics reclassification
/// never touches this rollup.
pub async fn summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ActivitySummary>> {
    let activity = ActivityRepo::find_by_id(&state.pool, &id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Activity", &id)))?;
    let images = ActivityImageRepo::list_by_activity(&state.pool, &id).await?;

    let mut totals = SeverityCounts::default();
    let mut defect_images = Vec::new();
    for image in images {
        totals.add(&image.frozen_counts());
        if image.status == "defects_detected" {
            defect_images.push(DefectImage {
                filename: image.filename,
                original_url: image.original_url,
                annotated_url: image.annotated_url,
                detections: image.detections.0,
            });
        }
    }

    state.audit.record(&format!(
        "Summary generated for activity {id}; Defect images: {}",
        defect_images.len()
    ));

    Ok(Json(ActivitySummary {
        activity_id: activity.id,
        activity_status: activity.status,
        high_defects: totals.high,
        medium_defects: totals.medium,
        low_defects: totals.low,
        defect_images,
    }))
}

/// DELETE /api/v1/activities/{id}
///
/// Removes the activity and its image rows. Backing objects are left in
/// place; use the `/objects` variant to remove those too.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    if !ActivityRepo::delete(&state.pool, &id).await? {
        return Err(AppError::Core(CoreError::not_found("Activity", &id)));
    }
    state
        .audit
        .record(&format!("Deleted activity {id} (rows only)"));
    Ok(Json(json!({
        "message": "Activity deleted",
        "activity_id": id,
    })))
}

/// DELETE /api/v1/activities/{id}/objects
///
/// Removes the activity's rows and, best-effort, the backing original and
/// annotated objects. A failed object delete is audited and skipped; the
/// row delete still proceeds.
pub async fn delete_with_objects(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let activity = ActivityRepo::find_by_id(&state.pool, &id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Activity", &id)))?;

    let images = ActivityImageRepo::list_by_activity(&state.pool, &activity.id).await?;
    for image in &images {
        let key = original_key(&image.filename);
        if let Err(e) = state.store.delete(&key).await {
            state.audit.record(&format!(
                "Failed to delete object {key} of activity {id}; Error: {e}"
            ));
        }
        if image.annotated_url.is_some() {
            let key = annotated_key(&image.filename);
            if let Err(e) = state.store.delete(&key).await {
                state.audit.record(&format!(
                    "Failed to delete object {key} of activity {id}; Error: {e}"
                ));
            }
        }
    }

    ActivityRepo::delete(&state.pool, &id).await?;
    state
        .audit
        .record(&format!("Deleted activity {id} and backing objects"));
    Ok(Json(json!({
        "message": "Activity deleted",
        "activity_id": id,
    })))
}

/// POST /api/v1/images
///
/// Multipart upload of a single image into the `original/` prefix. The
/// stored key is prefixed with a UUID so repeated uploads of the same
/// filename never collide.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<Value>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|f| !f.is_empty())
            .ok_or_else(|| AppError::BadRequest("Uploaded file must have a filename".to_string()))?;
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {e}")))?;

        let key = format!("{ORIGINAL_PREFIX}{}_{filename}", Uuid::new_v4());
        let url = state.store.put(&key, data.to_vec(), &content_type).await?;

        state.audit.record(&format!("Uploaded image {key}"));
        return Ok((
            StatusCode::CREATED,
            Json(json!({
                "message": "Upload successful",
                "key": key,
                "url": url,
            })),
        ));
    }

    Err(AppError::BadRequest(
        "Multipart field 'file' is required".to_string(),
    ))
}
