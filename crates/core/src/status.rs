//! Activity and image lifecycle statuses.
//!
//! Activity status is *derived* state: it is recomputed from the image
//! status multiset at the end of every sync run and never set directly by
//! a client. Keeping the derivation here as a pure function avoids the
//! invalid-state class where an activity's status disagrees with its
//! images.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityStatus {
    Pending,
    InProgress,
    Completed,
    Error,
}

impl ActivityStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityStatus::Pending => "pending",
            ActivityStatus::InProgress => "in-progress",
            ActivityStatus::Completed => "completed",
            ActivityStatus::Error => "error",
        }
    }

    /// Derive the activity status after a sync run.
    ///
    /// `run_errors` counts images that errored *in this run*. `statuses`
    /// is the full image-status multiset owned by the activity, including
    /// rows created by prior runs.
    pub fn derive<'a, I>(run_errors: u32, statuses: I) -> Self
    where
        I: IntoIterator<Item = &'a ImageStatus>,
    {
        if run_errors > 0 {
            return ActivityStatus::Error;
        }
        let all_terminal = statuses.into_iter().all(|s| s.is_terminal());
        if all_terminal {
            ActivityStatus::Completed
        } else {
            ActivityStatus::InProgress
        }
    }
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a single activity image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    Pending,
    Processing,
    NoDefects,
    DefectsDetected,
    Error,
}

impl ImageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageStatus::Pending => "pending",
            ImageStatus::Processing => "processing",
            ImageStatus::NoDefects => "no_defects",
            ImageStatus::DefectsDetected => "defects_detected",
            ImageStatus::Error => "error",
        }
    }

    /// Parse the stored string form. Unknown strings are rejected so a
    /// corrupted row surfaces instead of silently counting as pending.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ImageStatus::Pending),
            "processing" => Some(ImageStatus::Processing),
            "no_defects" => Some(ImageStatus::NoDefects),
            "defects_detected" => Some(ImageStatus::DefectsDetected),
            "error" => Some(ImageStatus::Error),
            _ => None,
        }
    }

    /// Terminal statuses are never mutated again. `error` is deliberately
    /// not terminal: an errored image is unresolved work.
    pub fn is_terminal(self) -> bool {
        matches!(self, ImageStatus::NoDefects | ImageStatus::DefectsDetected)
    }
}

impl fmt::Display for ImageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_run_error_wins() {
        let statuses = [ImageStatus::NoDefects, ImageStatus::DefectsDetected];
        assert_eq!(
            ActivityStatus::derive(1, statuses.iter()),
            ActivityStatus::Error
        );
    }

    #[test]
    fn all_terminal_means_completed() {
        let statuses = [ImageStatus::NoDefects, ImageStatus::DefectsDetected];
        assert_eq!(
            ActivityStatus::derive(0, statuses.iter()),
            ActivityStatus::Completed
        );
    }

    #[test]
    fn prior_run_error_images_hold_in_progress() {
        // An image errored by a *previous* run is unresolved work, so a
        // later clean run leaves the activity in-progress.
        let statuses = [ImageStatus::NoDefects, ImageStatus::Error];
        assert_eq!(
            ActivityStatus::derive(0, statuses.iter()),
            ActivityStatus::InProgress
        );
    }

    #[test]
    fn empty_activity_is_completed() {
        assert_eq!(
            ActivityStatus::derive(0, [].iter()),
            ActivityStatus::Completed
        );
    }

    #[test]
    fn round_trips_string_forms() {
        for s in [
            ImageStatus::Pending,
            ImageStatus::Processing,
            ImageStatus::NoDefects,
            ImageStatus::DefectsDetected,
            ImageStatus::Error,
        ] {
            assert_eq!(ImageStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(ImageStatus::parse("bogus"), None);
    }
}
