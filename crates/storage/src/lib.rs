//! Object-store collaborator.
//!
//! The pipeline only ever needs list/get/put/delete by key plus a public
//! URL, so that is the whole trait; tests substitute an in-memory fake
//! with deterministic fixtures instead of a bucket.
//!
//! Objects live under two canonical prefixes: `original/` for uploads
//! awaiting detection and `annotated/` for detector renders.

mod s3;

pub use s3::S3ObjectStore;

/// Key prefix for original (source) images.
pub const ORIGINAL_PREFIX: &str = "original/";

/// Key prefix for annotated detector output images.
pub const ANNOTATED_PREFIX: &str = "annotated/";

/// Build the canonical original-object key for a bare filename.
pub fn original_key(filename: &str) -> String {
    format!("{ORIGINAL_PREFIX}{filename}")
}

/// Build the canonical annotated-object key for a bare filename.
pub fn annotated_key(filename: &str) -> String {
    format!("{ANNOTATED_PREFIX}{filename}")
}

/// Strip any path prefix from an object key, leaving the bare filename.
pub fn filename_of(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreError {
    #[error("Failed to list objects under '{prefix}': {message}")]
    List { prefix: String, message: String },

    #[error("Failed to download object '{key}': {message}")]
    Get { key: String, message: String },

    #[error("Failed to upload object '{key}': {message}")]
    Put { key: String, message: String },

    #[error("Failed to delete object '{key}': {message}")]
    Delete { key: String, message: String },
}

/// Narrow interface over the backing object store.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// List all object keys under `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, ObjectStoreError>;

    /// Download an object's bytes.
    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError>;

    /// Upload bytes under `key`, returning the object's public URL.
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ObjectStoreError>;

    /// Delete the object under `key`.
    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;

    /// Public URL of the object under `key` (no I/O).
    fn url(&self, key: &str) -> String;
}
