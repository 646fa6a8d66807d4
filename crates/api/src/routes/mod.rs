pub mod health;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /activities                      list, create
/// /activities/{id}                 get, delete (DB rows only)
/// /activities/{id}/sync            run the sync orchestrator (POST)
/// /activities/{id}/summary         frozen-count rollup (GET)
/// /activities/{id}/objects         delete rows + backing objects (DELETE)
///
/// /images                          multipart upload into original/ (POST)
///
/// /analytics/summary               dynamic severity aggregates (GET)
/// /analytics/monthly-defects       per-day defect counts for a month (GET)
///
/// /config/thresholds               get, update, reset
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/activities",
            get(handlers::activity::list).post(handlers::activity::create),
        )
        .route(
            "/activities/{id}",
            get(handlers::activity::get_by_id).delete(handlers::activity::delete),
        )
        .route("/activities/{id}/sync", post(handlers::activity::sync))
        .route("/activities/{id}/summary", get(handlers::activity::summary))
        .route(
            "/activities/{id}/objects",
            delete(handlers::activity::delete_with_objects),
        )
        .route("/images", post(handlers::activity::upload))
        .route("/analytics/summary", get(handlers::analytics::summary))
        .route(
            "/analytics/monthly-defects",
            get(handlers::analytics::monthly_defects),
        )
        .route(
            "/config/thresholds",
            get(handlers::thresholds::read)
                .put(handlers::thresholds::update)
                .delete(handlers::thresholds::reset),
        )
}
