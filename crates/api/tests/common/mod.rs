//! Shared harness for API integration tests.
//!
//! Builds the application router exactly as `main.rs` does (same
//! middleware stack via `build_app_router`), but with in-memory fakes in
//! place of the object store and the detector so every scenario is
//! deterministic and offline.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

use defectra_api::config::ServerConfig;
use defectra_api::router::build_app_router;
use defectra_api::state::AppState;
use defectra_core::audit::AuditSink;
use defectra_core::detection::{Detection, DetectionOutput};
use defectra_core::threshold_store::ThresholdStore;
use defectra_detector::{DefectDetector, DetectorError};
use defectra_storage::{ObjectStore, ObjectStoreError};

/// In-memory object store keyed by full object key.
///
/// Listing can be forced to fail to exercise the discovery-failure path.
pub struct FakeObjectStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    fail_listing: AtomicBool,
    base_url: String,
}

impl FakeObjectStore {
    pub fn new() -> Self {
        FakeObjectStore {
            objects: Mutex::new(BTreeMap::new()),
            fail_listing: AtomicBool::new(false),
            base_url: "https://objects.test".to_string(),
        }
    }

    pub fn insert(&self, key: &str, bytes: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn set_fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl ObjectStore for FakeObjectStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, ObjectStoreError> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::List {
                prefix: prefix.to_string(),
                message: "injected listing failure".to_string(),
            });
        }
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| ObjectStoreError::Get {
                key: key.to_string(),
                message: "no such object".to_string(),
            })
    }

    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, ObjectStoreError> {
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
        Ok(self.url(key))
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        match self.objects.lock().unwrap().remove(key) {
            Some(_) => Ok(()),
            None => Err(ObjectStoreError::Delete {
                key: key.to_string(),
                message: "no such object".to_string(),
            }),
        }
    }

    fn url(&self, key: &str) -> String {
        format!("{}/{key}", self.base_url)
    }
}

/// What the scripted detector should do for a given input image.
#[derive(Clone)]
pub enum DetectorScript {
    /// No detections, no annotated render.
    Clean,
    /// These detections plus a non-empty annotated render.
    Defects(Vec<Detection>),
    /// Fail the inference call.
    Fail,
    /// Never complete (simulates a wedged inference service).
    Hang,
}

/// Detector fake scripted per image-byte fixture. Unscripted images come
/// back clean.
pub struct ScriptedDetector {
    scripts: Mutex<HashMap<Vec<u8>, DetectorScript>>,
}

impl ScriptedDetector {
    pub fn new() -> Self {
        ScriptedDetector {
            scripts: Mutex::new(HashMap::new()),
        }
    }

    pub fn script(&self, image: &[u8], script: DetectorScript) {
        self.scripts.lock().unwrap().insert(image.to_vec(), script);
    }
}

#[async_trait::async_trait]
impl DefectDetector for ScriptedDetector {
    async fn detect(&self, image: &[u8]) -> Result<DetectionOutput, DetectorError> {
        // Clone the script out so the lock is never held across an await.
        let script = self.scripts.lock().unwrap().get(image).cloned();
        match script {
            None | Some(DetectorScript::Clean) => Ok(DetectionOutput {
                detections: Vec::new(),
                annotated_image: Vec::new(),
            }),
            Some(DetectorScript::Defects(detections)) => Ok(DetectionOutput {
                detections,
                annotated_image: b"annotated-png-bytes".to_vec(),
            }),
            Some(DetectorScript::Fail) => {
                Err(DetectorError::Request("injected detector failure".into()))
            }
            Some(DetectorScript::Hang) => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

/// Build a `Detection` fixture with the given confidence.
pub fn detection(id: u32, confidence: f64) -> Detection {
    Detection {
        id,
        class: "defect".to_string(),
        confidence,
        bbox: defectra_core::detection::BoundingBox {
            x1: 0,
            y1: 0,
            x2: 10,
            y2: 10,
        },
    }
}

/// Everything a test needs: the wired router plus handles to the fakes
/// and the threshold document.
pub struct TestContext {
    router: Router,
    pub state: AppState,
    pub store: Arc<FakeObjectStore>,
    pub detector: Arc<ScriptedDetector>,
    pub thresholds: Arc<ThresholdStore>,
    _tmp: TempDir,
}

impl TestContext {
    /// A fresh clone of the router for a one-shot request.
    pub fn app(&self) -> Router {
        self.router.clone()
    }
}

fn test_config(tmp: &TempDir) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        detection_timeout_secs: 5,
        threshold_config_path: tmp
            .path()
            .join("config.json")
            .to_string_lossy()
            .into_owned(),
        audit_log_path: tmp.path().join("audit.log").to_string_lossy().into_owned(),
        object_store_bucket: "test-bucket".to_string(),
        object_store_public_url: "https://objects.test".to_string(),
        detector_url: "http://detector.test".to_string(),
    }
}

/// Build the full application with fakes wired in. The temp dir backing
/// the threshold document and audit log lives as long as the context.
pub fn test_context(pool: SqlitePool) -> TestContext {
    let tmp = TempDir::new().expect("failed to create temp dir");
    let config = test_config(&tmp);

    let store = Arc::new(FakeObjectStore::new());
    let detector = Arc::new(ScriptedDetector::new());
    let thresholds = Arc::new(ThresholdStore::new(&config.threshold_config_path));
    let audit = Arc::new(AuditSink::new(&config.audit_log_path));

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        store: store.clone(),
        detector: detector.clone(),
        thresholds: thresholds.clone(),
        audit,
        sync_guard: Arc::new(Mutex::new(Default::default())),
    };

    TestContext {
        router: build_app_router(state.clone(), &config),
        state,
        store,
        detector,
        thresholds,
        _tmp: tmp,
    }
}

// --- Request helpers -------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("failed to build request"),
    )
    .await
    .expect("request failed")
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("failed to build request"),
    )
    .await
    .expect("request failed")
}

pub async fn post_empty(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .expect("failed to build request"),
    )
    .await
    .expect("request failed")
}

pub async fn put_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("PUT")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("failed to build request"),
    )
    .await
    .expect("request failed")
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .expect("failed to build request"),
    )
    .await
    .expect("request failed")
}

/// Deserialized JSON body of a response.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("failed to read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body was not valid JSON")
}

/// Create an activity through the API and return its id.
pub async fn create_activity(ctx: &TestContext, name: &str) -> String {
    let response = post_json(
        ctx.app(),
        "/api/v1/activities",
        serde_json::json!({ "name": name }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["activity_id"]
        .as_str()
        .expect("activity_id missing")
        .to_string()
}

/// Run one sync for `activity_id` and return the parsed report.
pub async fn run_sync(ctx: &TestContext, activity_id: &str) -> serde_json::Value {
    let response = post_empty(
        ctx.app(),
        &format!("/api/v1/activities/{activity_id}/sync"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}
