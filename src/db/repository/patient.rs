use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::appointment::parse_uuid;
use crate::db::sqlite::{parse_db_timestamp, to_db_timestamp};
use crate::db::DatabaseError;
use crate::models::*;

const PATIENT_COLUMNS: &str =
    "id, doctor_id, name, phone, email, date_of_birth, notes, upcoming_visit, created_at, updated_at";

/// Raw row; identifiers and dates are checked after the statement finishes.
struct PatientRow {
    id: String,
    doctor_id: String,
    name: String,
    phone: Option<String>,
    email: Option<String>,
    date_of_birth: Option<String>,
    notes: Option<String>,
    upcoming_visit: Option<String>,
    created_at: String,
    updated_at: String,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<PatientRow> {
    Ok(PatientRow {
        id: row.get(0)?,
        doctor_id: row.get(1)?,
        name: row.get(2)?,
        phone: row.get(3)?,
        email: row.get(4)?,
        date_of_birth: row.get(5)?,
        notes: row.get(6)?,
        upcoming_visit: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    let date_of_birth = row
        .date_of_birth
        .as_deref()
        .map(|d| {
            NaiveDate::parse_from_str(d, "%Y-%m-%d").map_err(|_| {
                DatabaseError::ConstraintViolation(format!("malformed date of birth '{d}'"))
            })
        })
        .transpose()?;

    Ok(Patient {
        id: parse_uuid(&row.id, "patient id")?,
        doctor_id: parse_uuid(&row.doctor_id, "doctor id")?,
        name: row.name,
        phone: row.phone,
        email: row.email,
        date_of_birth,
        notes: row.notes,
        upcoming_visit: row
            .upcoming_visit
            .as_deref()
            .map(|v| parse_db_timestamp(7, v))
            .transpose()?,
        created_at: parse_db_timestamp(8, &row.created_at)?,
        updated_at: parse_db_timestamp(9, &row.updated_at)?,
    })
}

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, doctor_id, name, phone, email, date_of_birth, notes,
                               upcoming_visit, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            patient.id.to_string(),
            patient.doctor_id.to_string(),
            patient.name,
            patient.phone,
            patient.email,
            patient.date_of_birth.map(|d| d.to_string()),
            patient.notes,
            patient.upcoming_visit.as_ref().map(to_db_timestamp),
            to_db_timestamp(&patient.created_at),
            to_db_timestamp(&patient.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
    let patient = conn
        .query_row(
            &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"),
            params![id.to_string()],
            read_row,
        )
        .optional()?;
    patient.map(patient_from_row).transpose()
}

/// Patients of one doctor, alphabetical.
pub fn list_patients(conn: &Connection, doctor_id: &Uuid) -> Result<Vec<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients WHERE doctor_id = ?1 ORDER BY name ASC"
    ))?;

    let rows = stmt
        .query_map(params![doctor_id.to_string()], read_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(patient_from_row).collect()
}

/// Overwrite the cached upcoming visit. `None` clears it.
pub fn set_upcoming_visit(
    conn: &Connection,
    id: &Uuid,
    upcoming_visit: Option<&DateTime<Utc>>,
    updated_at: &DateTime<Utc>,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE patients SET upcoming_visit = ?2, updated_at = ?3 WHERE id = ?1",
        params![
            id.to_string(),
            upcoming_visit.map(to_db_timestamp),
            to_db_timestamp(updated_at),
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Patient".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn delete_patient(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let changed = conn.execute("DELETE FROM patients WHERE id = ?1", params![id.to_string()])?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Patient".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}
