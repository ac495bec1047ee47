//! SQLite-backed implementation of both store traits.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use super::{AppointmentStore, PatientStore, StoreError};
use crate::db::{self, DatabaseError};
use crate::models::{Appointment, AppointmentPatch, DeletionRecord, Patient};

/// One connection shared by the appointment and patient stores.
pub struct SqliteClinicStore {
    conn: Mutex<Connection>,
}

impl SqliteClinicStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Open (and migrate) the database file at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self::new(db::open_database(path)?))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self::new(db::open_memory_database()?))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::StoreUnavailable("database connection lock poisoned".into()))
    }

    /// Audit entries recorded against a patient, newest first.
    pub fn patient_audit_trail(&self, patient_id: &Uuid) -> Result<Vec<db::AuditEntry>, StoreError> {
        let conn = self.lock()?;
        Ok(db::query_audit_by_entity(&conn, &patient_entity(patient_id))?)
    }
}

fn patient_entity(id: &Uuid) -> String {
    format!("patient:{id}")
}

impl AppointmentStore for SqliteClinicStore {
    fn insert(&self, appointment: &Appointment) -> Result<(), StoreError> {
        let conn = self.lock()?;
        if db::get_patient(&conn, &appointment.patient_id)?.is_none() {
            return Err(StoreError::not_found("Patient", &appointment.patient_id));
        }
        db::insert_appointment(&conn, appointment)?;
        Ok(())
    }

    fn get(&self, id: &Uuid) -> Result<Appointment, StoreError> {
        let conn = self.lock()?;
        db::get_appointment(&conn, id)?.ok_or_else(|| StoreError::not_found("Appointment", id))
    }

    fn update(&self, id: &Uuid, patch: &AppointmentPatch) -> Result<Appointment, StoreError> {
        let conn = self.lock()?;
        db::update_appointment(&conn, id, patch)?;
        db::get_appointment(&conn, id)?.ok_or_else(|| StoreError::not_found("Appointment", id))
    }

    fn delete(&self, id: &Uuid) -> Result<(), StoreError> {
        let conn = self.lock()?;
        db::delete_appointment(&conn, id)?;
        Ok(())
    }

    fn list(&self, doctor_id: &Uuid, patient_id: Option<&Uuid>) -> Result<Vec<Appointment>, StoreError> {
        let conn = self.lock()?;
        Ok(db::list_appointments(&conn, doctor_id, patient_id)?)
    }
}

impl PatientStore for SqliteClinicStore {
    fn insert(&self, patient: &Patient) -> Result<(), StoreError> {
        let conn = self.lock()?;
        db::insert_patient(&conn, patient)?;
        Ok(())
    }

    fn get(&self, id: &Uuid) -> Result<Patient, StoreError> {
        let conn = self.lock()?;
        db::get_patient(&conn, id)?.ok_or_else(|| StoreError::not_found("Patient", id))
    }

    fn list(&self, doctor_id: &Uuid) -> Result<Vec<Patient>, StoreError> {
        let conn = self.lock()?;
        Ok(db::list_patients(&conn, doctor_id)?)
    }

    fn set_upcoming_visit(
        &self,
        patient_id: &Uuid,
        upcoming_visit: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        db::set_upcoming_visit(&conn, patient_id, upcoming_visit.as_ref(), &updated_at)?;
        Ok(())
    }

    /// Appointments still referencing the patient (for example those owned by
    /// another doctor) are removed in the same transaction.
    fn delete(&self, patient_id: &Uuid, record: &DeletionRecord) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction().map_err(DatabaseError::from)?;

        let leftover = db::delete_patient_appointments(&tx, patient_id)?;
        db::delete_patient(&tx, patient_id)?;

        let detail = serde_json::json!({
            "reason": record.reason,
            "appointments_removed": record.appointments_removed + leftover,
        })
        .to_string();
        db::insert_audit_entry(
            &tx,
            &record.deleted_at,
            &record.actor,
            "delete",
            &patient_entity(patient_id),
            Some(&detail),
        )?;

        tx.commit().map_err(DatabaseError::from)?;
        Ok(())
    }
}
