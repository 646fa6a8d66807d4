//! Persistent severity-threshold configuration.
//!
//! Thresholds live in a single JSON document shared with unrelated
//! credential/config fields, read and written as a whole. Writers
//! serialize through a mutex so a `set` merging with co-located fields
//! never loses a concurrent update; reads take no lock (a transiently
//! stale read is acceptable).

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::error::CoreError;
use crate::severity::Thresholds;

const LOW_KEY: &str = "low";
const HIGH_KEY: &str = "high";

/// Origin of the currently active thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Explicitly configured by an operator.
    User,
    /// Compiled-in defaults; no override is stored.
    Default,
}

/// Active thresholds plus where they came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdSettings {
    pub thresholds: Thresholds,
    pub provenance: Provenance,
}

/// Process-wide threshold store backed by a JSON document on disk.
pub struct ThresholdStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ThresholdStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ThresholdStore {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current thresholds. Provenance is `user` iff the document carries
    /// both threshold keys; a document with only one (hand-edited) reads
    /// as the compiled-in defaults.
    pub fn get(&self) -> Result<ThresholdSettings, CoreError> {
        let doc = self.read_document()?;
        match (read_f64(&doc, LOW_KEY), read_f64(&doc, HIGH_KEY)) {
            (Some(low), Some(high)) => Ok(ThresholdSettings {
                thresholds: Thresholds { low, high },
                provenance: Provenance::User,
            }),
            _ => Ok(ThresholdSettings {
                thresholds: Thresholds::default(),
                provenance: Provenance::Default,
            }),
        }
    }

    /// Validate and persist a new pair, preserving any co-located
    /// non-threshold fields in the document.
    pub async fn set(&self, low: f64, high: f64) -> Result<ThresholdSettings, CoreError> {
        let thresholds = Thresholds::new(low, high)?;

        let _guard = self.write_lock.lock().await;
        let mut doc = self.read_document()?;
        doc.insert(LOW_KEY.to_string(), json_f64(thresholds.low)?);
        doc.insert(HIGH_KEY.to_string(), json_f64(thresholds.high)?);
        self.write_document(&doc)?;

        Ok(ThresholdSettings {
            thresholds,
            provenance: Provenance::User,
        })
    }

    /// Remove any user override, reverting `get` to the compiled-in
    /// defaults. Co-located fields survive; only the threshold keys are
    /// removed, and the document itself is deleted when nothing remains.
    pub async fn clear(&self) -> Result<(), CoreError> {
        let _guard = self.write_lock.lock().await;
        if !self.path.exists() {
            return Ok(());
        }
        let mut doc = self.read_document()?;
        doc.remove(LOW_KEY);
        doc.remove(HIGH_KEY);
        if doc.is_empty() {
            std::fs::remove_file(&self.path).map_err(|e| {
                CoreError::Config(format!(
                    "Failed to remove config document {}: {e}",
                    self.path.display()
                ))
            })?;
        } else {
            self.write_document(&doc)?;
        }
        Ok(())
    }

    fn read_document(&self) -> Result<Map<String, Value>, CoreError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
            CoreError::Config(format!(
                "Failed to read config document {}: {e}",
                self.path.display()
            ))
        })?;
        let value: Value = serde_json::from_str(&raw).map_err(|e| {
            CoreError::Config(format!(
                "Config document {} is not valid JSON: {e}",
                self.path.display()
            ))
        })?;
        match value {
            Value::Object(map) => Ok(map),
            _ => Err(CoreError::Config(format!(
                "Config document {} must be a JSON object",
                self.path.display()
            ))),
        }
    }

    fn write_document(&self, doc: &Map<String, Value>) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    CoreError::Config(format!(
                        "Failed to create config directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }
        let rendered = serde_json::to_string_pretty(&Value::Object(doc.clone()))
            .map_err(|e| CoreError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&self.path, rendered).map_err(|e| {
            CoreError::Config(format!(
                "Failed to write config document {}: {e}",
                self.path.display()
            ))
        })
    }
}

fn read_f64(doc: &Map<String, Value>, key: &str) -> Option<f64> {
    doc.get(key).and_then(Value::as_f64)
}

fn json_f64(value: f64) -> Result<Value, CoreError> {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| CoreError::Config(format!("Threshold {value} is not a finite number")))
}
