//! Handlers for the `/config/thresholds` resource.
//!
//! Credentials that share the backing document are never exposed here;
//! responses carry only the threshold pair and its provenance.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use defectra_core::threshold_store::{Provenance, ThresholdSettings};

use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateThresholds {
    pub low: f64,
    pub high: f64,
}

#[derive(Debug, Serialize)]
pub struct ThresholdsResponse {
    pub low: f64,
    pub high: f64,
    pub source: Provenance,
}

impl From<ThresholdSettings> for ThresholdsResponse {
    fn from(settings: ThresholdSettings) -> Self {
        ThresholdsResponse {
            low: settings.thresholds.low,
            high: settings.thresholds.high,
            source: settings.provenance,
        }
    }
}

/// GET /api/v1/config/thresholds
pub async fn read(State(state): State<AppState>) -> AppResult<Json<ThresholdsResponse>> {
    let settings = state.thresholds.get()?;
    state.audit.record("Thresholds read via API");
    Ok(Json(settings.into()))
}

/// PUT /api/v1/config/thresholds
///
/// Validation (each in (0, 1), low < high) happens in the store before
/// anything is written.
pub async fn update(
    State(state): State<AppState>,
    Json(payload): Json<UpdateThresholds>,
) -> AppResult<Json<ThresholdsResponse>> {
    let settings = state.thresholds.set(payload.low, payload.high).await?;
    state.audit.record(&format!(
        "Thresholds updated: low={}, high={}",
        settings.thresholds.low, settings.thresholds.high
    ));
    Ok(Json(settings.into()))
}

/// DELETE /api/v1/config/thresholds
///
/// Removes the user override and reports the (default) thresholds now in
/// effect.
pub async fn reset(State(state): State<AppState>) -> AppResult<Json<ThresholdsResponse>> {
    state.thresholds.clear().await?;
    let settings = state.thresholds.get()?;
    state.audit.record("Thresholds reset via API");
    Ok(Json(settings.into()))
}
