use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::sqlite::{parse_db_timestamp, to_db_timestamp};
use crate::db::DatabaseError;
use crate::models::*;

const APPOINTMENT_COLUMNS: &str =
    "id, patient_id, doctor_id, date, time, status, type, notes, diagnosis, prescription,
     created_at, updated_at";

/// Raw row, converted after the statement finishes so enum errors surface as `InvalidEnum`.
struct AppointmentRow {
    id: String,
    patient_id: String,
    doctor_id: String,
    date: Option<String>,
    time: Option<String>,
    status: String,
    appointment_type: Option<String>,
    notes: Option<String>,
    diagnosis: Option<String>,
    prescription: Option<String>,
    created_at: String,
    updated_at: String,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<AppointmentRow> {
    Ok(AppointmentRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        date: row.get(3)?,
        time: row.get(4)?,
        status: row.get(5)?,
        appointment_type: row.get(6)?,
        notes: row.get(7)?,
        diagnosis: row.get(8)?,
        prescription: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

pub(super) fn parse_uuid(raw: &str, field: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(raw).map_err(|_| DatabaseError::ConstraintViolation(format!(
        "malformed {field} '{raw}'"
    )))
}

fn appointment_from_row(row: AppointmentRow) -> Result<Appointment, DatabaseError> {
    Ok(Appointment {
        id: parse_uuid(&row.id, "appointment id")?,
        patient_id: parse_uuid(&row.patient_id, "patient id")?,
        doctor_id: parse_uuid(&row.doctor_id, "doctor id")?,
        date: row
            .date
            .as_deref()
            .map(|d| parse_db_timestamp(3, d))
            .transpose()?,
        time: row.time,
        status: AppointmentStatus::from_str(&row.status)?,
        appointment_type: row.appointment_type,
        notes: row.notes,
        diagnosis: row.diagnosis,
        prescription: row.prescription,
        created_at: parse_db_timestamp(10, &row.created_at)?,
        updated_at: parse_db_timestamp(11, &row.updated_at)?,
    })
}

pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (id, patient_id, doctor_id, date, time, status, type, notes,
                                   diagnosis, prescription, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            appt.id.to_string(),
            appt.patient_id.to_string(),
            appt.doctor_id.to_string(),
            appt.date.as_ref().map(to_db_timestamp),
            appt.time,
            appt.status.as_str(),
            appt.appointment_type,
            appt.notes,
            appt.diagnosis,
            appt.prescription,
            to_db_timestamp(&appt.created_at),
            to_db_timestamp(&appt.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_appointment(conn: &Connection, id: &Uuid) -> Result<Option<Appointment>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
            params![id.to_string()],
            read_row,
        )
        .optional()?;
    row.map(appointment_from_row).transpose()
}

/// Appointments for a doctor, optionally narrowed to one patient, ordered by date
/// ascending with undated records last.
pub fn list_appointments(
    conn: &Connection,
    doctor_id: &Uuid,
    patient_id: Option<&Uuid>,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE doctor_id = ?1 AND (?2 IS NULL OR patient_id = ?2)
         ORDER BY date IS NULL, date ASC, created_at ASC"
    ))?;

    let rows = stmt
        .query_map(
            params![doctor_id.to_string(), patient_id.map(|p| p.to_string())],
            read_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(appointment_from_row).collect()
}

/// Apply a partial update; columns whose patch field is `None` keep their value.
pub fn update_appointment(
    conn: &Connection,
    id: &Uuid,
    patch: &AppointmentPatch,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET
            date = COALESCE(?2, date),
            time = COALESCE(?3, time),
            status = COALESCE(?4, status),
            type = COALESCE(?5, type),
            notes = COALESCE(?6, notes),
            diagnosis = COALESCE(?7, diagnosis),
            prescription = COALESCE(?8, prescription),
            updated_at = COALESCE(?9, updated_at)
         WHERE id = ?1",
        params![
            id.to_string(),
            patch.date.as_ref().map(to_db_timestamp),
            patch.time,
            patch.status.map(|s| s.as_str()),
            patch.appointment_type,
            patch.notes,
            patch.diagnosis,
            patch.prescription,
            patch.updated_at.as_ref().map(to_db_timestamp),
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Appointment".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn delete_appointment(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "DELETE FROM appointments WHERE id = ?1",
        params![id.to_string()],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Appointment".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn delete_patient_appointments(conn: &Connection, patient_id: &Uuid) -> Result<usize, DatabaseError> {
    let removed = conn.execute(
        "DELETE FROM appointments WHERE patient_id = ?1",
        params![patient_id.to_string()],
    )?;
    Ok(removed)
}
