//! Shared application state handed to UI action handlers.
//!
//! Built once from `ClinicConfig`; every field is `Send + Sync` so the state
//! can sit behind an `Arc` and serve several screens.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::{self, ClinicConfig};
use crate::models::{Appointment, AppointmentStatus, DeletionRecord, Patient, ScreeningResult};
use crate::patients::{self, PatientRequest};
use crate::screening::{HttpLesionClassifier, LesionClassifier, ScreeningError};
use crate::store::{AppointmentStore, PatientStore, SqliteClinicStore, StoreError};
use crate::visit_sync::{StatusChange, SyncError, VisitSync};

pub struct CoreState {
    appointments: Arc<dyn AppointmentStore>,
    patients: Arc<dyn PatientStore>,
    visit_sync: VisitSync,
    classifier: Box<dyn LesionClassifier>,
}

impl CoreState {
    /// Assemble state from explicit collaborators.
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        patients: Arc<dyn PatientStore>,
        classifier: Box<dyn LesionClassifier>,
        config: &ClinicConfig,
    ) -> Self {
        let visit_sync = VisitSync::new(
            appointments.clone(),
            patients.clone(),
            config.refresh_policy.clone(),
        );
        Self {
            appointments,
            patients,
            visit_sync,
            classifier,
        }
    }

    /// Open the SQLite store and the HTTP classifier named by `config`.
    pub fn open(config: &ClinicConfig) -> Result<Self, StartupError> {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let store = Arc::new(SqliteClinicStore::open(&config.database_path)?);
        let classifier = HttpLesionClassifier::new(&config.screening_url, config.screening_timeout_secs)?;

        tracing::info!(
            app = config::APP_NAME,
            version = config::APP_VERSION,
            database = %config.database_path.display(),
            refresh_triggers = ?config.refresh_policy.names(),
            "Clinic state ready"
        );
        Ok(Self::new(store.clone(), store, Box::new(classifier), config))
    }

    pub fn visit_sync(&self) -> &VisitSync {
        &self.visit_sync
    }

    pub fn register_patient(&self, request: PatientRequest, now: DateTime<Utc>) -> Result<Patient, StoreError> {
        patients::register_patient(self.patients.as_ref(), request, now)
    }

    pub fn patients_of(&self, doctor_id: &Uuid) -> Result<Vec<Patient>, StoreError> {
        self.patients.list(doctor_id)
    }

    /// A doctor's agenda, optionally for one patient, in date order.
    pub fn agenda(&self, doctor_id: &Uuid, patient_id: Option<&Uuid>) -> Result<Vec<Appointment>, StoreError> {
        self.appointments.list(doctor_id, patient_id)
    }

    /// "Mark complete" and the other status buttons.
    pub fn change_status(
        &self,
        appointment_id: &Uuid,
        new_status: AppointmentStatus,
        now: DateTime<Utc>,
    ) -> Result<StatusChange, SyncError> {
        let appointment = self
            .appointments
            .get(appointment_id)
            .map_err(SyncError::AppointmentWrite)?;
        self.visit_sync.on_status_change(&appointment, new_status, now)
    }

    pub fn delete_patient(
        &self,
        patient_id: &Uuid,
        actor: &str,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<DeletionRecord, StoreError> {
        patients::delete_patient(
            self.appointments.as_ref(),
            self.patients.as_ref(),
            patient_id,
            actor,
            reason,
            now,
        )
    }

    pub fn screen_lesion(&self, image: &[u8], content_type: &str) -> Result<ScreeningResult, ScreeningError> {
        self.classifier.classify(image, content_type)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum StartupError {
    #[error("Cannot create data directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Store(#[from] StoreError),

    #[error("Screening client error: {0}")]
    Screening(#[from] ScreeningError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::models::{LesionClass, NewAppointment, ScreeningModel};
    use crate::screening::MockLesionClassifier;
    use crate::visit_sync::{CacheOutcome, RefreshPolicy};

    fn at(m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, m, d, 9, 0, 0).unwrap()
    }

    fn state_in_memory(policy: RefreshPolicy) -> CoreState {
        let store = Arc::new(SqliteClinicStore::open_in_memory().unwrap());
        let classifier = MockLesionClassifier::new(ScreeningResult {
            lesion_class: LesionClass::MelanocyticNevus,
            confidence: 0.88,
            model_used: ScreeningModel::NasNetMobile,
            visualization_jpeg: vec![0xFF, 0xD8],
        });
        let config = ClinicConfig {
            refresh_policy: policy,
            ..ClinicConfig::default()
        };
        CoreState::new(store.clone(), store, Box::new(classifier), &config)
    }

    fn request(doctor_id: Uuid) -> PatientRequest {
        PatientRequest {
            doctor_id,
            name: "Tomás Reyes".into(),
            phone: None,
            email: None,
            date_of_birth: None,
            notes: None,
        }
    }

    #[test]
    fn mark_complete_flow_updates_patient() {
        let state = state_in_memory(RefreshPolicy::default());
        let doctor = Uuid::new_v4();
        let patient = state.register_patient(request(doctor), at(1, 1)).unwrap();

        let mut booked = Vec::new();
        for day in [10, 20] {
            let (appt, _) = state
                .visit_sync()
                .schedule_appointment(
                    NewAppointment {
                        patient_id: patient.id,
                        doctor_id: doctor,
                        date: at(1, day),
                        time: Some("09:00".into()),
                        appointment_type: Some("Dermoscopy".into()),
                        notes: None,
                    },
                    at(1, 1),
                )
                .unwrap();
            booked.push(appt);
        }

        let change = state
            .change_status(&booked[0].id, AppointmentStatus::Completed, at(1, 1))
            .unwrap();
        assert_eq!(change.cache, CacheOutcome::Refreshed(Some(at(1, 20))));

        let stored = state
            .patients_of(&doctor)
            .unwrap()
            .into_iter()
            .find(|p| p.id == patient.id)
            .unwrap();
        assert_eq!(stored.upcoming_visit, Some(at(1, 20)));
        assert_eq!(state.agenda(&doctor, Some(&patient.id)).unwrap().len(), 2);
    }

    #[test]
    fn change_status_of_unknown_appointment() {
        let state = state_in_memory(RefreshPolicy::all());
        let err = state
            .change_status(&Uuid::new_v4(), AppointmentStatus::Completed, at(1, 1))
            .unwrap_err();
        assert!(matches!(err, SyncError::AppointmentWrite(StoreError::NotFound { .. })));
    }

    #[test]
    fn delete_patient_through_state() {
        let state = state_in_memory(RefreshPolicy::default());
        let doctor = Uuid::new_v4();
        let patient = state.register_patient(request(doctor), at(1, 1)).unwrap();
        let record = state.delete_patient(&patient.id, "dr.ito", None, at(1, 2)).unwrap();
        assert_eq!(record.appointments_removed, 0);
        assert!(state.patients_of(&doctor).unwrap().is_empty());
    }

    #[test]
    fn screening_goes_through_classifier() {
        let state = state_in_memory(RefreshPolicy::default());
        let result = state.screen_lesion(&[0xFF, 0xD8, 0xFF], "image/jpeg").unwrap();
        assert_eq!(result.lesion_class, LesionClass::MelanocyticNevus);
        assert!(state.screen_lesion(&[1], "text/plain").is_err());
    }

    #[test]
    fn open_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClinicConfig {
            database_path: dir.path().join("nested").join("clinic.db"),
            ..ClinicConfig::default()
        };
        let state = CoreState::open(&config).unwrap();
        assert!(config.database_path.exists());
        assert!(state.patients_of(&Uuid::new_v4()).unwrap().is_empty());
    }
}
