//! Defect-detection collaborator.
//!
//! Inference is an opaque black box behind [`DefectDetector`]: image bytes
//! in, a detection sequence plus an optional annotated render out.
//! Confidence values arrive already normalized to `[0, 1]`. This is the
//! only place machine-learning inference is invoked; tests substitute a
//! fake with fixture detections.

mod http;

pub use http::HttpDetector;

use defectra_core::detection::DetectionOutput;

#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("Detector request failed: {0}")]
    Request(String),

    #[error("Detector returned an unusable response: {0}")]
    Decode(String),
}

/// Narrow interface over the vision-model inference service.
#[async_trait::async_trait]
pub trait DefectDetector: Send + Sync {
    /// Run detection over one image.
    async fn detect(&self, image: &[u8]) -> Result<DetectionOutput, DetectorError>;
}
