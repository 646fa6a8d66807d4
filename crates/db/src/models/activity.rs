//! Activity entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use defectra_core::types::{ActivityId, Timestamp};

/// A row from the `activities` table.
///
/// `status` holds the string form of
/// [`defectra_core::status::ActivityStatus`]; it is derived state, written
/// only by the sync orchestrator.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Activity {
    pub id: ActivityId,
    pub name: String,
    pub status: String,
    pub from_value: Option<String>,
    pub to_value: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for creating a new activity.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateActivity {
    pub name: String,
    pub from_value: Option<String>,
    pub to_value: Option<String>,
}
