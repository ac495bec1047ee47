//! Store interfaces consumed by the visit synchronization layer.
//!
//! Two traits define the boundary to the hosted backend:
//! - AppointmentStore: appointment documents keyed by id
//! - PatientStore: patient documents keyed by id, plus the cached upcoming visit
//!
//! `SqliteClinicStore` implements both against a local database.

pub mod sqlite;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{Appointment, AppointmentPatch, DeletionRecord, Patient};

pub use sqlite::SqliteClinicStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl StoreError {
    pub fn not_found(entity_type: &str, id: &Uuid) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }
}

impl From<DatabaseError> for StoreError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity_type, id } => Self::NotFound { entity_type, id },
            DatabaseError::InvalidEnum { .. } | DatabaseError::ConstraintViolation(_) => {
                Self::InvalidState(err.to_string())
            }
            DatabaseError::Sqlite(_) | DatabaseError::MigrationFailed { .. } => {
                Self::StoreUnavailable(err.to_string())
            }
        }
    }
}

/// Appointment documents.
pub trait AppointmentStore: Send + Sync {
    fn insert(&self, appointment: &Appointment) -> Result<(), StoreError>;

    fn get(&self, id: &Uuid) -> Result<Appointment, StoreError>;

    /// Apply a partial update and return the stored record afterwards.
    fn update(&self, id: &Uuid, patch: &AppointmentPatch) -> Result<Appointment, StoreError>;

    fn delete(&self, id: &Uuid) -> Result<(), StoreError>;

    /// Appointments of `doctor_id`, optionally narrowed to one patient, ordered
    /// by date ascending.
    fn list(&self, doctor_id: &Uuid, patient_id: Option<&Uuid>) -> Result<Vec<Appointment>, StoreError>;
}

/// Patient documents.
pub trait PatientStore: Send + Sync {
    fn insert(&self, patient: &Patient) -> Result<(), StoreError>;

    fn get(&self, id: &Uuid) -> Result<Patient, StoreError>;

    fn list(&self, doctor_id: &Uuid) -> Result<Vec<Patient>, StoreError>;

    /// Overwrite the cached upcoming visit; the only write path for that field.
    fn set_upcoming_visit(
        &self,
        patient_id: &Uuid,
        upcoming_visit: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Remove the patient record and record the deletion in the audit trail.
    fn delete(&self, patient_id: &Uuid, record: &DeletionRecord) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traits_are_object_safe() {
        fn _assert_appointments(_: &dyn AppointmentStore) {}
        fn _assert_patients(_: &dyn PatientStore) {}
    }

    #[test]
    fn database_errors_map_to_taxonomy() {
        let not_found: StoreError = DatabaseError::NotFound {
            entity_type: "Patient".into(),
            id: "p1".into(),
        }
        .into();
        assert!(matches!(not_found, StoreError::NotFound { ref id, .. } if id == "p1"));

        let invalid: StoreError = DatabaseError::InvalidEnum {
            field: "AppointmentStatus".into(),
            value: "done".into(),
        }
        .into();
        assert!(matches!(invalid, StoreError::InvalidState(_)));

        let unavailable: StoreError =
            DatabaseError::Sqlite(rusqlite::Error::InvalidQuery).into();
        assert!(matches!(unavailable, StoreError::StoreUnavailable(_)));
    }

    #[test]
    fn not_found_message_names_entity() {
        let id = Uuid::nil();
        let err = StoreError::not_found("Appointment", &id);
        assert_eq!(
            err.to_string(),
            "Appointment not found: 00000000-0000-0000-0000-000000000000"
        );
    }
}
