//! Request handlers, grouped by resource.

pub mod activity;
pub mod analytics;
pub mod thresholds;
