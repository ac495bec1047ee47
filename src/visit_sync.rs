//! Upcoming-visit synchronization.
//!
//! `Patient::upcoming_visit` is a cached copy of `next_visit()` over the
//! patient's appointments. `VisitSync` owns every appointment write that can
//! move that value and decides, through an explicit `RefreshPolicy`, which of
//! them re-derive the cache.
//!
//! Each operation performs the appointment write first. The cache refresh
//! runs only after that write succeeded, and its failure never rolls the
//! appointment write back: the cache stays stale until the next qualifying
//! write (or an explicit `reconcile_patient`) for that patient.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::*;
use crate::next_visit::next_visit;
use crate::store::{AppointmentStore, PatientStore, StoreError};

// ═══════════════════════════════════════════════════════════
// Refresh policy
// ═══════════════════════════════════════════════════════════

/// The set of appointment writes that re-derive the patient's upcoming visit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshPolicy {
    triggers: HashSet<RefreshTrigger>,
}

impl RefreshPolicy {
    /// Only `scheduled → completed` refreshes the cache. Date edits,
    /// cancellations and deletions leave it as is.
    pub fn on_completion() -> Self {
        Self::from_triggers([])
    }

    /// Every write that can move the earliest scheduled appointment.
    pub fn all() -> Self {
        Self::from_triggers(RefreshTrigger::ALL)
    }

    /// `StatusCompleted` is always included; `triggers` only add to it.
    pub fn from_triggers(triggers: impl IntoIterator<Item = RefreshTrigger>) -> Self {
        let mut triggers: HashSet<_> = triggers.into_iter().collect();
        triggers.insert(RefreshTrigger::StatusCompleted);
        Self { triggers }
    }

    /// Parse a comma-separated list of trigger names, e.g.
    /// `"status_completed,date_edited"`. `"all"` selects every trigger, an
    /// empty list leaves completion as the only one.
    pub fn parse(spec: &str) -> Result<Self, DatabaseError> {
        if spec.trim() == "all" {
            return Ok(Self::all());
        }
        let triggers = spec
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(RefreshTrigger::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_triggers(triggers))
    }

    pub fn with(mut self, trigger: RefreshTrigger) -> Self {
        self.triggers.insert(trigger);
        self
    }

    pub fn contains(&self, trigger: RefreshTrigger) -> bool {
        self.triggers.contains(&trigger)
    }

    /// Trigger names in declaration order, for logging and config round-trips.
    pub fn names(&self) -> Vec<&'static str> {
        RefreshTrigger::ALL
            .iter()
            .filter(|t| self.triggers.contains(*t))
            .map(|t| t.as_str())
            .collect()
    }
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self::on_completion()
    }
}

// ═══════════════════════════════════════════════════════════
// Errors and outcomes
// ═══════════════════════════════════════════════════════════

#[derive(Error, Debug)]
pub enum SyncError {
    /// Rejected before any write.
    #[error("Invalid request: {0}")]
    Invalid(StoreError),

    /// The appointment write failed; nothing was committed.
    #[error("Appointment write failed: {0}")]
    AppointmentWrite(StoreError),

    /// The appointment write is committed but the patient's upcoming visit
    /// could not be refreshed.
    #[error("Appointment {appointment_id} saved, but upcoming visit of patient {patient_id} was not refreshed: {source}")]
    CacheRefresh {
        appointment_id: Uuid,
        patient_id: Uuid,
        source: StoreError,
    },
}

impl SyncError {
    /// Whether the primary appointment write landed.
    pub fn appointment_committed(&self) -> bool {
        matches!(self, Self::CacheRefresh { .. })
    }
}

/// What happened to the patient's cached upcoming visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Recomputed and written; carries the value written.
    Refreshed(Option<DateTime<Utc>>),
    /// The write was not in the refresh policy, or changed nothing.
    Skipped,
}

#[derive(Debug, Clone)]
pub struct StatusChange {
    pub appointment: Appointment,
    pub previous_status: AppointmentStatus,
    pub cache: CacheOutcome,
}

// ═══════════════════════════════════════════════════════════
// VisitSync
// ═══════════════════════════════════════════════════════════

/// Write path for appointments that keeps `Patient::upcoming_visit` in step.
pub struct VisitSync {
    appointments: Arc<dyn AppointmentStore>,
    patients: Arc<dyn PatientStore>,
    policy: RefreshPolicy,
}

impl VisitSync {
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        patients: Arc<dyn PatientStore>,
        policy: RefreshPolicy,
    ) -> Self {
        tracing::debug!(triggers = ?policy.names(), "Visit sync configured");
        Self {
            appointments,
            patients,
            policy,
        }
    }

    pub fn policy(&self) -> &RefreshPolicy {
        &self.policy
    }

    /// Persist a status transition, then refresh the patient's upcoming visit
    /// when the transition is in the policy and actually changes the status.
    ///
    /// Marking an already-completed appointment completed again rewrites
    /// `updated_at` only; the patient record is not touched.
    pub fn on_status_change(
        &self,
        appointment: &Appointment,
        new_status: AppointmentStatus,
        now: DateTime<Utc>,
    ) -> Result<StatusChange, SyncError> {
        if appointment.date.is_none() {
            return Err(SyncError::Invalid(StoreError::InvalidState(format!(
                "appointment {} has no date; cannot move it to {new_status}",
                appointment.id
            ))));
        }

        let previous_status = appointment.status;
        let updated = self
            .appointments
            .update(&appointment.id, &AppointmentPatch::status(new_status, now))
            .map_err(SyncError::AppointmentWrite)?;

        tracing::info!(
            appointment_id = %appointment.id,
            from = previous_status.as_str(),
            to = new_status.as_str(),
            "Appointment status changed"
        );

        let trigger = RefreshTrigger::for_status(new_status);
        let cache = if previous_status == new_status {
            CacheOutcome::Skipped
        } else {
            self.refresh_if(trigger, &updated, now)?
        };

        Ok(StatusChange {
            appointment: updated,
            previous_status,
            cache,
        })
    }

    /// Book a new `scheduled` appointment.
    pub fn schedule_appointment(
        &self,
        new: NewAppointment,
        now: DateTime<Utc>,
    ) -> Result<(Appointment, CacheOutcome), SyncError> {
        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id: new.patient_id,
            doctor_id: new.doctor_id,
            date: Some(new.date),
            time: new.time,
            status: AppointmentStatus::Scheduled,
            appointment_type: new.appointment_type,
            notes: new.notes,
            diagnosis: None,
            prescription: None,
            created_at: now,
            updated_at: now,
        };
        check_time_matches_date(&appointment)?;

        self.appointments
            .insert(&appointment)
            .map_err(SyncError::AppointmentWrite)?;
        tracing::info!(
            appointment_id = %appointment.id,
            patient_id = %appointment.patient_id,
            "Appointment scheduled"
        );

        let cache = self.refresh_if(RefreshTrigger::AppointmentCreated, &appointment, now)?;
        Ok((appointment, cache))
    }

    /// Apply a field edit (date, time, type, notes, clinical text).
    /// Only a changed `date` can raise `DateEdited`.
    pub fn edit_appointment(
        &self,
        appointment: &Appointment,
        edit: AppointmentEdit,
        now: DateTime<Utc>,
    ) -> Result<(Appointment, CacheOutcome), SyncError> {
        let date_changed = edit.date.is_some() && edit.date != appointment.date;
        let patch = edit.into_patch(now);

        let mut preview = appointment.clone();
        patch.apply_to(&mut preview);
        check_time_matches_date(&preview)?;

        let updated = self
            .appointments
            .update(&appointment.id, &patch)
            .map_err(SyncError::AppointmentWrite)?;

        let cache = if date_changed {
            self.refresh_if(RefreshTrigger::DateEdited, &updated, now)?
        } else {
            CacheOutcome::Skipped
        };
        Ok((updated, cache))
    }

    pub fn delete_appointment(
        &self,
        appointment: &Appointment,
        now: DateTime<Utc>,
    ) -> Result<CacheOutcome, SyncError> {
        self.appointments
            .delete(&appointment.id)
            .map_err(SyncError::AppointmentWrite)?;
        tracing::info!(appointment_id = %appointment.id, "Appointment deleted");

        self.refresh_if(RefreshTrigger::AppointmentDeleted, appointment, now)
    }

    /// Unconditionally recompute and store a patient's upcoming visit.
    pub fn reconcile_patient(
        &self,
        doctor_id: &Uuid,
        patient_id: &Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        let appointments = self.appointments.list(doctor_id, Some(patient_id))?;
        let visit = next_visit(&appointments, now);
        self.patients.set_upcoming_visit(patient_id, visit, now)?;
        tracing::info!(
            patient_id = %patient_id,
            upcoming_visit = ?visit,
            "Upcoming visit refreshed"
        );
        Ok(visit)
    }

    fn refresh_if(
        &self,
        trigger: RefreshTrigger,
        appointment: &Appointment,
        now: DateTime<Utc>,
    ) -> Result<CacheOutcome, SyncError> {
        if !self.policy.contains(trigger) {
            tracing::debug!(
                appointment_id = %appointment.id,
                patient_id = %appointment.patient_id,
                trigger = trigger.as_str(),
                "Trigger not in refresh policy; upcoming visit may be stale"
            );
            return Ok(CacheOutcome::Skipped);
        }

        match self.reconcile_patient(&appointment.doctor_id, &appointment.patient_id, now) {
            Ok(visit) => Ok(CacheOutcome::Refreshed(visit)),
            Err(e) => {
                tracing::warn!(
                    appointment_id = %appointment.id,
                    patient_id = %appointment.patient_id,
                    trigger = trigger.as_str(),
                    error = %e,
                    "Upcoming visit refresh failed; cache left stale"
                );
                Err(SyncError::CacheRefresh {
                    appointment_id: appointment.id,
                    patient_id: appointment.patient_id,
                    source: e,
                })
            }
        }
    }
}

fn check_time_matches_date(appointment: &Appointment) -> Result<(), SyncError> {
    if appointment.time_matches_date() {
        return Ok(());
    }
    Err(SyncError::Invalid(StoreError::InvalidState(format!(
        "time {:?} does not match date {:?} of appointment {}",
        appointment.time, appointment.date, appointment.id
    ))))
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
