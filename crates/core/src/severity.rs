//! Severity classification of detection confidences.
//!
//! This is the single shared bucketing implementation. The sync
//! orchestrator uses it to freeze per-image counts at write time, and the
//! analytics aggregator uses it to reclassify stored detections at read
//! time; the two call sites must never diverge.

use serde::{Deserialize, Serialize};

use crate::detection::Detection;
use crate::error::CoreError;

/// Compiled-in default low threshold.
pub const DEFAULT_LOW: f64 = 0.3;

/// Compiled-in default high threshold.
pub const DEFAULT_HIGH: f64 = 0.7;

/// Severity bucket for a single detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A low/high confidence-threshold pair, `0 < low < high < 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub low: f64,
    pub high: f64,
}

impl Thresholds {
    pub fn new(low: f64, high: f64) -> Result<Self, CoreError> {
        let pair = Thresholds { low, high };
        pair.validate()?;
        Ok(pair)
    }

    /// Reject a malformed pair: either bound outside the open interval
    /// `(0, 1)`, or `low >= high`.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (value, name) in [(self.low, "low"), (self.high, "high")] {
            if !(value > 0.0 && value < 1.0) {
                return Err(CoreError::Validation(format!(
                    "{name} threshold must be strictly between 0 and 1, got {value}"
                )));
            }
        }
        if self.low >= self.high {
            return Err(CoreError::Validation(format!(
                "low threshold must be strictly less than high ({} >= {})",
                self.low, self.high
            )));
        }
        Ok(())
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            low: DEFAULT_LOW,
            high: DEFAULT_HIGH,
        }
    }
}

/// Per-bucket detection counts for one image or an aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub low: i64,
    pub medium: i64,
    pub high: i64,
}

impl SeverityCounts {
    pub fn total(&self) -> i64 {
        self.low + self.medium + self.high
    }

    pub fn add(&mut self, other: &SeverityCounts) {
        self.low += other.low;
        self.medium += other.medium;
        self.high += other.high;
    }

    pub fn is_zero(&self) -> bool {
        self.total() == 0
    }
}

/// Bucket a single confidence value.
///
/// Total, exhaustive and mutually exclusive: `high` iff
/// `confidence >= thresholds.high`, `medium` iff
/// `thresholds.low <= confidence < thresholds.high`, else `low`.
/// Assumes a valid threshold pair; validation is the caller's job.
pub fn classify(confidence: f64, thresholds: &Thresholds) -> Severity {
    if confidence >= thresholds.high {
        Severity::High
    } else if confidence >= thresholds.low {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Roll a detection sequence into per-bucket counts. Empty input yields
/// all zeros.
pub fn count_detections(detections: &[Detection], thresholds: &Thresholds) -> SeverityCounts {
    let mut counts = SeverityCounts::default();
    for det in detections {
        match classify(det.confidence, thresholds) {
            Severity::Low => counts.low += 1,
            Severity::Medium => counts.medium += 1,
            Severity::High => counts.high += 1,
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::BoundingBox;

    fn det(confidence: f64) -> Detection {
        Detection {
            id: 1,
            class: "patches".to_string(),
            confidence,
            bbox: BoundingBox {
                x1: 0,
                y1: 0,
                x2: 10,
                y2: 10,
            },
        }
    }

    #[test]
    fn exactly_one_bucket_for_any_confidence() {
        let thresholds = Thresholds::new(0.3, 0.7).unwrap();
        for i in 0..=100 {
            let c = i as f64 / 100.0;
            // classify is total; check it against the inline rule.
            let expected = if c >= 0.7 {
                Severity::High
            } else if c >= 0.3 {
                Severity::Medium
            } else {
                Severity::Low
            };
            assert_eq!(classify(c, &thresholds), expected, "confidence {c}");
        }
    }

    #[test]
    fn boundaries_are_inclusive_on_the_upper_bucket() {
        let thresholds = Thresholds::new(0.3, 0.7).unwrap();
        assert_eq!(classify(0.7, &thresholds), Severity::High);
        assert_eq!(classify(0.3, &thresholds), Severity::Medium);
        assert_eq!(classify(0.299_999, &thresholds), Severity::Low);
    }

    #[test]
    fn empty_sequence_counts_zero() {
        let counts = count_detections(&[], &Thresholds::default());
        assert_eq!(counts, SeverityCounts::default());
        assert!(counts.is_zero());
    }

    #[test]
    fn counts_sum_per_bucket() {
        let thresholds = Thresholds::new(0.3, 0.7).unwrap();
        let detections = vec![det(0.85), det(0.55), det(0.1), det(0.7)];
        let counts = count_detections(&detections, &thresholds);
        assert_eq!(counts.high, 2);
        assert_eq!(counts.medium, 1);
        assert_eq!(counts.low, 1);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn rejects_malformed_pairs() {
        assert!(Thresholds::new(0.7, 0.3).is_err());
        assert!(Thresholds::new(0.5, 0.5).is_err());
        assert!(Thresholds::new(0.0, 0.7).is_err());
        assert!(Thresholds::new(0.3, 1.0).is_err());
        assert!(Thresholds::new(-0.1, 0.5).is_err());
    }

    #[test]
    fn default_pair_is_valid() {
        assert!(Thresholds::default().validate().is_ok());
    }
}
