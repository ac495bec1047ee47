//! Patient registration and deletion.
//!
//! Deletion is one explicit operation: the patient's appointments go first,
//! then the patient record, with an audit entry written by the patient store
//! alongside the delete. There is no soft-delete flag.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{DeletionRecord, Patient};
use crate::store::{AppointmentStore, PatientStore, StoreError};

/// Form fields for a new patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRequest {
    pub doctor_id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub notes: Option<String>,
}

const MAX_NAME_LEN: usize = 200;
const MAX_NOTES_LEN: usize = 5000;

/// Validate and store a new patient. `upcoming_visit` starts empty.
pub fn register_patient(
    patients: &dyn PatientStore,
    request: PatientRequest,
    now: DateTime<Utc>,
) -> Result<Patient, StoreError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(StoreError::InvalidState("Patient name is required".into()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(StoreError::InvalidState("Patient name too long".into()));
    }
    if request.notes.as_ref().is_some_and(|n| n.len() > MAX_NOTES_LEN) {
        return Err(StoreError::InvalidState(format!(
            "Notes too long (max {MAX_NOTES_LEN} chars)"
        )));
    }
    if let Some(dob) = request.date_of_birth {
        if dob > now.date_naive() {
            return Err(StoreError::InvalidState("Date of birth is in the future".into()));
        }
    }

    let patient = Patient {
        id: Uuid::new_v4(),
        doctor_id: request.doctor_id,
        name: name.to_string(),
        phone: request.phone,
        email: request.email,
        date_of_birth: request.date_of_birth,
        notes: request.notes,
        upcoming_visit: None,
        created_at: now,
        updated_at: now,
    };
    patients.insert(&patient)?;
    tracing::info!(patient_id = %patient.id, "Patient registered");
    Ok(patient)
}

/// Delete a patient and the appointments their doctor holds for them.
///
/// Appointment deletions are not transactional with the patient delete; if
/// the patient delete fails, the removed appointments stay removed and the
/// call can be repeated.
pub fn delete_patient(
    appointments: &dyn AppointmentStore,
    patients: &dyn PatientStore,
    patient_id: &Uuid,
    actor: &str,
    reason: Option<&str>,
    now: DateTime<Utc>,
) -> Result<DeletionRecord, StoreError> {
    if actor.trim().is_empty() {
        return Err(StoreError::InvalidState("Deletion requires an actor".into()));
    }

    let patient = patients.get(patient_id)?;
    let owned = appointments.list(&patient.doctor_id, Some(patient_id))?;
    for appointment in &owned {
        appointments.delete(&appointment.id)?;
    }

    let record = DeletionRecord {
        actor: actor.to_string(),
        reason: reason.map(str::to_string),
        deleted_at: now,
        appointments_removed: owned.len(),
    };
    patients.delete(patient_id, &record)?;

    tracing::info!(
        patient_id = %patient_id,
        appointments_removed = owned.len(),
        "Patient deleted"
    );
    Ok(record)
}
