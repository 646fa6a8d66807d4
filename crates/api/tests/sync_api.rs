//! Integration tests for the sync orchestrator endpoint.
//!
//! Uses Axum's tower::ServiceExt to send requests directly to the router
//! without a TCP listener; object store and detector are in-memory fakes.

mod common;

use axum::http::StatusCode;
use common::{body_json, detection, get, post_empty, DetectorScript};
use sqlx::SqlitePool;

// ---------------------------------------------------------------------------
// Happy path: mixed defective and clean images
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn sync_processes_defective_and_clean_images(pool: SqlitePool) {
    let ctx = common::test_context(pool);
    ctx.store.insert("original/plate-1.png", b"plate-1");
    ctx.store.insert("original/plate-2.png", b"plate-2");
    ctx.store.insert("original/plate-3.png", b"plate-3");
    // One image with a high- and a medium-confidence detection under the
    // default (0.3, 0.7) thresholds; the other two come back clean.
    ctx.detector.script(
        b"plate-1",
        DetectorScript::Defects(vec![detection(1, 0.85), detection(2, 0.55)]),
    );

    let id = common::create_activity(&ctx, "Inspection A").await;
    let report = common::run_sync(&ctx, &id).await;

    assert_eq!(report["new_images_found"], 3);
    assert_eq!(report["processed_images"], 3);
    assert_eq!(report["error_images"], 0);
    assert_eq!(report["activity_status"], "completed");

    // The annotated render was published for the defective image only.
    assert!(ctx.store.contains("annotated/plate-1.png"));
    assert!(!ctx.store.contains("annotated/plate-2.png"));

    let response = get(ctx.app(), &format!("/api/v1/activities/{id}/summary")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let summary = body_json(response).await;
    assert_eq!(summary["activity_status"], "completed");
    assert_eq!(summary["high_defects"], 1);
    assert_eq!(summary["medium_defects"], 1);
    assert_eq!(summary["low_defects"], 0);

    let defect_images = summary["defect_images"].as_array().unwrap();
    assert_eq!(defect_images.len(), 1);
    assert_eq!(defect_images[0]["filename"], "plate-1.png");
    assert_eq!(
        defect_images[0]["annotated_url"],
        "https://objects.test/annotated/plate-1.png"
    );
    assert_eq!(defect_images[0]["detections"].as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn clean_images_get_no_annotated_url(pool: SqlitePool) {
    let ctx = common::test_context(pool);
    ctx.store.insert("original/clean.png", b"clean");

    let id = common::create_activity(&ctx, "Clean run").await;
    common::run_sync(&ctx, &id).await;

    let activity = body_json(get(ctx.app(), &format!("/api/v1/activities/{id}")).await).await;
    let images = activity["images"].as_array().unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0]["status"], "no_defects");
    assert!(images[0]["annotated_url"].is_null());
    assert_eq!(
        images[0]["original_url"],
        "https://objects.test/original/clean.png"
    );
}

// ---------------------------------------------------------------------------
// Idempotence
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn rerun_over_unchanged_objects_is_a_noop(pool: SqlitePool) {
    let ctx = common::test_context(pool);
    ctx.store.insert("original/one.png", b"one");
    ctx.store.insert("original/two.png", b"two");

    let id = common::create_activity(&ctx, "Idempotent").await;
    let first = common::run_sync(&ctx, &id).await;
    assert_eq!(first["new_images_found"], 2);

    let second = common::run_sync(&ctx, &id).await;
    assert_eq!(second["new_images_found"], 0);
    assert_eq!(second["processed_images"], 0);
    assert_eq!(second["activity_status"], "completed");

    let activity = body_json(get(ctx.app(), &format!("/api/v1/activities/{id}")).await).await;
    assert_eq!(activity["images"].as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn rerun_picks_up_only_new_objects(pool: SqlitePool) {
    let ctx = common::test_context(pool);
    ctx.store.insert("original/old.png", b"old");

    let id = common::create_activity(&ctx, "Incremental").await;
    common::run_sync(&ctx, &id).await;

    ctx.store.insert("original/new.png", b"new");
    let report = common::run_sync(&ctx, &id).await;
    assert_eq!(report["new_images_found"], 1);

    let activity = body_json(get(ctx.app(), &format!("/api/v1/activities/{id}")).await).await;
    assert_eq!(activity["images"].as_array().unwrap().len(), 2);
}

// ---------------------------------------------------------------------------
// Partial failure isolation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn one_failing_image_never_aborts_the_batch(pool: SqlitePool) {
    let ctx = common::test_context(pool);
    ctx.store.insert("original/good-1.png", b"good-1");
    ctx.store.insert("original/bad.png", b"bad");
    ctx.store.insert("original/good-2.png", b"good-2");
    ctx.detector.script(b"bad", DetectorScript::Fail);

    let id = common::create_activity(&ctx, "Partial failure").await;
    let report = common::run_sync(&ctx, &id).await;

    assert_eq!(report["new_images_found"], 3);
    assert_eq!(report["processed_images"], 2);
    assert_eq!(report["error_images"], 1);
    assert_eq!(report["activity_status"], "error");

    let activity = body_json(get(ctx.app(), &format!("/api/v1/activities/{id}")).await).await;
    let statuses: Vec<&str> = activity["images"]
        .as_array()
        .unwrap()
        .iter()
        .map(|img| img["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses.iter().filter(|s| **s == "no_defects").count(), 2);
    assert_eq!(statuses.iter().filter(|s| **s == "error").count(), 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn prior_run_error_images_hold_activity_in_progress(pool: SqlitePool) {
    let ctx = common::test_context(pool);
    ctx.store.insert("original/flaky.png", b"flaky");
    ctx.detector.script(b"flaky", DetectorScript::Fail);

    let id = common::create_activity(&ctx, "Sticky error").await;
    let first = common::run_sync(&ctx, &id).await;
    assert_eq!(first["activity_status"], "error");

    // A later run that discovers nothing new has no run errors, but the
    // errored image is still unresolved work.
    let second = common::run_sync(&ctx, &id).await;
    assert_eq!(second["new_images_found"], 0);
    assert_eq!(second["error_images"], 0);
    assert_eq!(second["activity_status"], "in-progress");
}

// ---------------------------------------------------------------------------
// Discovery failure
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn listing_failure_marks_activity_error_and_creates_no_rows(pool: SqlitePool) {
    let ctx = common::test_context(pool);
    ctx.store.insert("original/unreachable.png", b"unreachable");
    ctx.store.set_fail_listing(true);

    let id = common::create_activity(&ctx, "Upstream down").await;
    let response = post_empty(ctx.app(), &format!("/api/v1/activities/{id}/sync")).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert_eq!(body["code"], "UPSTREAM_UNAVAILABLE");

    let activity = body_json(get(ctx.app(), &format!("/api/v1/activities/{id}")).await).await;
    assert_eq!(activity["status"], "error");
    assert!(activity["images"].as_array().unwrap().is_empty());

    // The store recovers; a later run completes normally.
    ctx.store.set_fail_listing(false);
    let report = common::run_sync(&ctx, &id).await;
    assert_eq!(report["new_images_found"], 1);
    assert_eq!(report["activity_status"], "completed");
}

// ---------------------------------------------------------------------------
// Concurrency guard
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn concurrent_sync_on_same_activity_is_rejected(pool: SqlitePool) {
    let ctx = common::test_context(pool);
    let id = common::create_activity(&ctx, "Guarded").await;

    // Simulate an in-flight run holding the per-activity guard.
    ctx.state.sync_guard.lock().unwrap().insert(id.clone());

    let response = post_empty(ctx.app(), &format!("/api/v1/activities/{id}/sync")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["code"], "CONFLICT");

    // Once the in-flight run releases the guard, sync works again.
    ctx.state.sync_guard.lock().unwrap().remove(&id);
    let report = common::run_sync(&ctx, &id).await;
    assert_eq!(report["activity_status"], "completed");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn cancelled_sync_releases_the_activity_guard(pool: SqlitePool) {
    let ctx = common::test_context(pool);
    ctx.store.insert("original/slow.png", b"slow");
    ctx.detector.script(b"slow", DetectorScript::Hang);

    let id = common::create_activity(&ctx, "Abandoned").await;

    // Drop the request future mid-detection, the way a client disconnect
    // or the request-timeout layer would.
    let sync_path = format!("/api/v1/activities/{id}/sync");
    let in_flight = post_empty(ctx.app(), &sync_path);
    let cancelled =
        tokio::time::timeout(std::time::Duration::from_millis(200), in_flight).await;
    assert!(cancelled.is_err(), "hanging detection should outlive the deadline");

    // The guard slot must have been released with the dropped run: the
    // retry gets a report, not a conflict.
    ctx.detector.script(b"slow", DetectorScript::Clean);
    let report = common::run_sync(&ctx, &id).await;
    assert_eq!(report["new_images_found"], 0);
    // The row created by the abandoned run is still `processing`, which
    // is unresolved work.
    assert_eq!(report["activity_status"], "in-progress");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn sync_of_missing_activity_returns_404(pool: SqlitePool) {
    let ctx = common::test_context(pool);
    let response = post_empty(ctx.app(), "/api/v1/activities/no-such-id/sync").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
