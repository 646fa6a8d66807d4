/// Image rows are keyed by SQLite rowids.
pub type DbId = i64;

/// Activities are keyed by UUID strings, generated at creation time.
pub type ActivityId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
