use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub notes: Option<String>,
    /// Cached start of the earliest future scheduled appointment.
    /// Written only by `VisitSync`.
    pub upcoming_visit: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Audit details recorded alongside a patient deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionRecord {
    pub actor: String,
    pub reason: Option<String>,
    pub deleted_at: DateTime<Utc>,
    pub appointments_removed: usize,
}
