use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use defectra_core::audit::AuditSink;
use defectra_core::threshold_store::ThresholdStore;
use defectra_detector::DefectDetector;
use defectra_storage::ObjectStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`). The object
/// store and detector are trait objects so integration tests can inject
/// in-memory fakes with deterministic fixtures.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: defectra_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Object-store collaborator (original/annotated images).
    pub store: Arc<dyn ObjectStore>,
    /// Defect-detection collaborator.
    pub detector: Arc<dyn DefectDetector>,
    /// Process-wide severity-threshold configuration.
    pub thresholds: Arc<ThresholdStore>,
    /// Append-only operational audit log.
    pub audit: Arc<AuditSink>,
    /// Activities with a sync run currently in flight; a second sync on
    /// the same activity is rejected with a conflict. Slots are held by
    /// [`crate::sync`] permits that release on drop, so a cancelled
    /// request cannot strand an activity. A std mutex is deliberate: the
    /// critical sections are a lone insert/remove and never cross an
    /// await point.
    pub sync_guard: Arc<Mutex<HashSet<String>>>,
}
