/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Per-image budget for download + detection during a sync run, in
    /// seconds; expiry is treated as that image's failure (default: `60`).
    pub detection_timeout_secs: u64,
    /// Path of the JSON threshold/config document.
    pub threshold_config_path: String,
    /// Path of the append-only audit log.
    pub audit_log_path: String,
    /// Object-store bucket holding original and annotated images.
    pub object_store_bucket: String,
    /// Public base URL under which objects in the bucket are reachable.
    pub object_store_public_url: String,
    /// Base URL of the defect-detection inference service.
    pub detector_url: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                             |
    /// |---------------------------|-------------------------------------|
    /// | `HOST`                    | `0.0.0.0`                           |
    /// | `PORT`                    | `3000`                              |
    /// | `CORS_ORIGINS`            | `http://localhost:5173`             |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                                |
    /// | `DETECTION_TIMEOUT_SECS`  | `60`                                |
    /// | `THRESHOLD_CONFIG_PATH`   | `data/config.json`                  |
    /// | `AUDIT_LOG_PATH`          | `data/logs/audit.log`               |
    /// | `OBJECT_STORE_BUCKET`     | `defectra-images`                   |
    /// | `OBJECT_STORE_PUBLIC_URL` | `https://{bucket}.s3.amazonaws.com` |
    /// | `DETECTOR_URL`            | `http://localhost:8500`             |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let detection_timeout_secs: u64 = std::env::var("DETECTION_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("DETECTION_TIMEOUT_SECS must be a valid u64");

        let threshold_config_path =
            std::env::var("THRESHOLD_CONFIG_PATH").unwrap_or_else(|_| "data/config.json".into());

        let audit_log_path =
            std::env::var("AUDIT_LOG_PATH").unwrap_or_else(|_| "data/logs/audit.log".into());

        let object_store_bucket =
            std::env::var("OBJECT_STORE_BUCKET").unwrap_or_else(|_| "defectra-images".into());

        let object_store_public_url = std::env::var("OBJECT_STORE_PUBLIC_URL")
            .unwrap_or_else(|_| format!("https://{object_store_bucket}.s3.amazonaws.com"));

        let detector_url =
            std::env::var("DETECTOR_URL").unwrap_or_else(|_| "http://localhost:8500".into());

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            detection_timeout_secs,
            threshold_config_path,
            audit_log_path,
            object_store_bucket,
            object_store_public_url,
            detector_url,
        }
    }
}
