//! Handlers for the `/analytics` resource.
//!
//! Analytics is the dynamic-severity read path: stored detection sets
//! are reclassified under the active (or per-request override)
//! thresholds on every call. The frozen per-image columns written at
//! sync time are never consulted here.

use std::collections::{BTreeMap, HashMap};

use axum::extract::{Query, State};
use axum::Json;
use chrono::{Datelike, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use defectra_core::analytics::{
    day_key, month_bounds, month_days, month_key, weekday_name, ActivitySeverity,
};
use defectra_core::error::CoreError;
use defectra_core::severity::{self, SeverityCounts, Thresholds};
use defectra_core::threshold_store::Provenance;
use defectra_db::repositories::{ActivityImageRepo, ActivityRepo};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
    pub low_threshold: Option<f64>,
    pub high_threshold: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SeverityDistribution {
    pub low: i64,
    pub medium: i64,
    pub high: i64,
}

#[derive(Debug, Serialize)]
pub struct ActivitySeverityDistribution {
    pub low: i64,
    pub medium: i64,
    pub high: i64,
    pub none: i64,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsSummary {
    pub total_images: i64,
    pub total_defects: i64,
    pub total_activities: i64,
    pub defect_severity_distribution: SeverityDistribution,
    pub activity_severity_distribution: ActivitySeverityDistribution,
    pub defects_over_time: BTreeMap<String, i64>,
    pub defects_by_month: BTreeMap<String, i64>,
    pub defects_by_weekday: BTreeMap<String, i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
}

/// GET /api/v1/analytics/summary
///
/// Override thresholds apply only when both query parameters are
/// supplied; supplying exactly one is rejected. Overrides are
/// read-path-only and leave stored rows untouched.
pub async fn summary(
    State(state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> AppResult<Json<AnalyticsSummary>> {
    let mut warnings: Vec<String> = Vec::new();

    let thresholds = match (params.low_threshold, params.high_threshold) {
        (Some(low), Some(high)) => Thresholds::new(low, high)?,
        (None, None) => {
            let settings = state.thresholds.get()?;
            if settings.provenance == Provenance::Default {
                warnings.push(
                    "Using default thresholds; update /config/thresholds to customize."
                        .to_string(),
                );
            }
            settings.thresholds
        }
        _ => {
            return Err(AppError::Core(CoreError::Validation(
                "low_threshold and high_threshold must be supplied together".to_string(),
            )))
        }
    };

    let total_activities = ActivityRepo::count(&state.pool).await?;
    let total_images = ActivityImageRepo::count(&state.pool).await?;
    let rows = ActivityImageRepo::list_detection_rows(&state.pool).await?;

    let mut totals = SeverityCounts::default();
    let mut activity_map: HashMap<String, SeverityCounts> = HashMap::new();
    let mut defects_over_time: BTreeMap<String, i64> = BTreeMap::new();
    let mut defects_by_month: BTreeMap<String, i64> = BTreeMap::new();
    let mut defects_by_weekday: BTreeMap<String, i64> = BTreeMap::new();

    for row in &rows {
        let counts = severity::count_detections(&row.detections.0, &thresholds);
        totals.add(&counts);
        activity_map
            .entry(row.activity_id.clone())
            .or_default()
            .add(&counts);

        let defects = counts.total();
        *defects_over_time.entry(day_key(&row.created_at)).or_insert(0) += defects;
        *defects_by_month.entry(month_key(&row.created_at)).or_insert(0) += defects;
        *defects_by_weekday
            .entry(weekday_name(&row.created_at))
            .or_insert(0) += defects;
    }

    let mut distribution = ActivitySeverityDistribution {
        low: 0,
        medium: 0,
        high: 0,
        none: 0,
    };
    for counts in activity_map.values() {
        match ActivitySeverity::bucket(counts) {
            ActivitySeverity::High => distribution.high += 1,
            ActivitySeverity::Medium => distribution.medium += 1,
            ActivitySeverity::Low => distribution.low += 1,
            ActivitySeverity::None => distribution.none += 1,
        }
    }

    let activities_without_images = total_activities - activity_map.len() as i64;
    if activities_without_images > 0 {
        warnings.push(format!(
            "{activities_without_images} activities have no images; counted as 'none'."
        ));
        distribution.none += activities_without_images;
    }

    state.audit.record("Analytics summary computed");

    Ok(Json(AnalyticsSummary {
        total_images,
        total_defects: totals.total(),
        total_activities,
        defect_severity_distribution: SeverityDistribution {
            low: totals.low,
            medium: totals.medium,
            high: totals.high,
        },
        activity_severity_distribution: distribution,
        defects_over_time,
        defects_by_month,
        defects_by_weekday,
        warnings: if warnings.is_empty() {
            None
        } else {
            Some(warnings)
        },
    }))
}

#[derive(Debug, Deserialize)]
pub struct MonthlyDefectsParams {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct MonthlyDefectPoint {
    pub day: NaiveDate,
    pub defect_count: i64,
}

/// GET /api/v1/analytics/monthly-defects
///
/// Per-day reclassified defect totals for one calendar month (defaults
/// to the current one). Every day of the month appears in the response,
/// zero-seeded, so charting clients never interpolate gaps.
pub async fn monthly_defects(
    State(state): State<AppState>,
    Query(params): Query<MonthlyDefectsParams>,
) -> AppResult<Json<Vec<MonthlyDefectPoint>>> {
    let now = Utc::now();
    let year = params.year.unwrap_or_else(|| now.year());
    let month = params.month.unwrap_or_else(|| now.month());

    let days = month_days(year, month)?;
    let (first, next) = month_bounds(year, month)?;
    let from = Utc.from_utc_datetime(&first.and_time(NaiveTime::MIN));
    let to = Utc.from_utc_datetime(&next.and_time(NaiveTime::MIN));

    let thresholds = state.thresholds.get()?.thresholds;
    let rows = ActivityImageRepo::list_detection_rows_between(&state.pool, from, to).await?;

    let mut by_day: BTreeMap<NaiveDate, i64> = days.iter().map(|d| (*d, 0)).collect();
    for row in &rows {
        let counts = severity::count_detections(&row.detections.0, &thresholds);
        if let Some(slot) = by_day.get_mut(&row.created_at.date_naive()) {
            *slot += counts.total();
        }
    }

    Ok(Json(
        by_day
            .into_iter()
            .map(|(day, defect_count)| MonthlyDefectPoint { day, defect_count })
            .collect(),
    ))
}
