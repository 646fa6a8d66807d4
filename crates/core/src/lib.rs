//! Pure domain logic for the defectra platform.
//!
//! This crate has zero internal dependencies so the classifier, status
//! derivation, and analytics bucketing can be used from any layer (API,
//! repositories, future CLI tooling) without pulling in sqlx or axum.

pub mod analytics;
pub mod audit;
pub mod detection;
pub mod error;
pub mod severity;
pub mod status;
pub mod threshold_store;
pub mod types;
