//! HTTP client for a remote inference service.

use base64::Engine as _;
use serde::Deserialize;

use defectra_core::detection::{Detection, DetectionOutput};

use crate::{DefectDetector, DetectorError};

/// JSON body returned by the inference service's `/detect` endpoint.
#[derive(Debug, Deserialize)]
struct DetectResponse {
    detections: Vec<Detection>,
    /// Base64-encoded PNG render with detection overlays; absent or empty
    /// when the model produced none.
    #[serde(default)]
    annotated_image: Option<String>,
}

/// [`DefectDetector`] over a remote HTTP inference service.
///
/// Posts raw image bytes to `{base_url}/detect` and decodes the JSON
/// response. The service owns preprocessing, the model, and rendering.
pub struct HttpDetector {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDetector {
    pub fn new(base_url: String) -> Self {
        HttpDetector {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait::async_trait]
impl DefectDetector for HttpDetector {
    async fn detect(&self, image: &[u8]) -> Result<DetectionOutput, DetectorError> {
        let url = format!("{}/detect", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await
            .map_err(|e| DetectorError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| DetectorError::Request(e.to_string()))?;

        let body: DetectResponse = response
            .json()
            .await
            .map_err(|e| DetectorError::Decode(e.to_string()))?;

        let annotated_image = match body.annotated_image.as_deref() {
            Some(encoded) if !encoded.is_empty() => base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map_err(|e| DetectorError::Decode(format!("bad annotated image: {e}")))?,
            _ => Vec::new(),
        };

        tracing::debug!(
            detections = body.detections.len(),
            annotated = !annotated_image.is_empty(),
            "Detection completed"
        );

        Ok(DetectionOutput {
            detections: body.detections,
            annotated_image,
        })
    }
}
