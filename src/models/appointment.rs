use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::AppointmentStatus;

/// Field names follow the hosted document schema (`patientId`, `type`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    /// Absolute start instant. Records imported from the document store may lack it.
    pub date: Option<DateTime<Utc>>,
    /// Wall-clock `HH:MM`, display only. Must match `date` when both are set.
    pub time: Option<String>,
    pub status: AppointmentStatus,
    #[serde(rename = "type")]
    pub appointment_type: Option<String>,
    pub notes: Option<String>,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Whether `date` and `time` agree, or one of them is absent.
    pub fn time_matches_date(&self) -> bool {
        match (&self.date, &self.time) {
            (Some(date), Some(time)) => date.format("%H:%M").to_string() == *time,
            _ => true,
        }
    }
}

/// Fields supplied by the caller when booking a new appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAppointment {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date: DateTime<Utc>,
    pub time: Option<String>,
    pub appointment_type: Option<String>,
    pub notes: Option<String>,
}

/// Partial update applied by `AppointmentStore::update`. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppointmentPatch {
    pub date: Option<DateTime<Utc>>,
    pub time: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub appointment_type: Option<String>,
    pub notes: Option<String>,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl AppointmentPatch {
    pub fn status(status: AppointmentStatus, updated_at: DateTime<Utc>) -> Self {
        Self {
            status: Some(status),
            updated_at: Some(updated_at),
            ..Default::default()
        }
    }

    /// Apply the patch to an in-memory copy, mirroring what the store persists.
    pub fn apply_to(&self, appointment: &mut Appointment) {
        if let Some(date) = self.date {
            appointment.date = Some(date);
        }
        if let Some(ref time) = self.time {
            appointment.time = Some(time.clone());
        }
        if let Some(status) = self.status {
            appointment.status = status;
        }
        if let Some(ref t) = self.appointment_type {
            appointment.appointment_type = Some(t.clone());
        }
        if let Some(ref notes) = self.notes {
            appointment.notes = Some(notes.clone());
        }
        if let Some(ref diagnosis) = self.diagnosis {
            appointment.diagnosis = Some(diagnosis.clone());
        }
        if let Some(ref prescription) = self.prescription {
            appointment.prescription = Some(prescription.clone());
        }
        if let Some(updated_at) = self.updated_at {
            appointment.updated_at = updated_at;
        }
    }
}

/// User-facing edit of an existing appointment (everything but status).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentEdit {
    pub date: Option<DateTime<Utc>>,
    pub time: Option<String>,
    pub appointment_type: Option<String>,
    pub notes: Option<String>,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
}

impl AppointmentEdit {
    pub fn into_patch(self, updated_at: DateTime<Utc>) -> AppointmentPatch {
        AppointmentPatch {
            date: self.date,
            time: self.time,
            status: None,
            appointment_type: self.appointment_type,
            notes: self.notes,
            diagnosis: self.diagnosis,
            prescription: self.prescription,
            updated_at: Some(updated_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Appointment {
        let at = Utc.with_ymd_and_hms(2025, 1, 10, 9, 30, 0).unwrap();
        Appointment {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            date: Some(at),
            time: Some("09:30".into()),
            status: AppointmentStatus::Scheduled,
            appointment_type: Some("Consultation".into()),
            notes: None,
            diagnosis: None,
            prescription: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn time_consistency_check() {
        let mut appt = sample();
        assert!(appt.time_matches_date());
        appt.time = Some("10:00".into());
        assert!(!appt.time_matches_date());
        appt.time = None;
        assert!(appt.time_matches_date());
    }

    #[test]
    fn patch_only_touches_set_fields() {
        let mut appt = sample();
        let later = Utc.with_ymd_and_hms(2025, 1, 11, 0, 0, 0).unwrap();
        AppointmentPatch::status(AppointmentStatus::Completed, later).apply_to(&mut appt);
        assert_eq!(appt.status, AppointmentStatus::Completed);
        assert_eq!(appt.updated_at, later);
        assert_eq!(appt.appointment_type.as_deref(), Some("Consultation"));
        assert_eq!(appt.time.as_deref(), Some("09:30"));
    }

    #[test]
    fn serializes_with_document_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["type"], "Consultation");
        assert_eq!(json["status"], "scheduled");
        assert!(json.get("patientId").is_some());
        assert!(json.get("updatedAt").is_some());
    }

    #[test]
    fn edit_never_carries_status() {
        let later = Utc.with_ymd_and_hms(2025, 1, 11, 0, 0, 0).unwrap();
        let patch = AppointmentEdit {
            notes: Some("bring previous biopsy".into()),
            ..Default::default()
        }
        .into_patch(later);
        assert!(patch.status.is_none());
        assert_eq!(patch.updated_at, Some(later));
    }
}
