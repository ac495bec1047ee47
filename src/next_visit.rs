//! Next-visit resolution.
//!
//! A patient's upcoming visit is the start of their earliest appointment that
//! is still `scheduled` and not yet in the past. Appointments equal to `now`
//! count as upcoming. Terminal and undated appointments never contribute.
//!
//! Pure functions over plain records: no store access, no clock.

use chrono::{DateTime, Utc};

use crate::models::{Appointment, AppointmentStatus};

/// The appointment that defines the next visit, if any.
///
/// When several appointments share the earliest date, which one is returned is
/// unspecified; only its date is meaningful.
pub fn next_appointment(appointments: &[Appointment], now: DateTime<Utc>) -> Option<&Appointment> {
    appointments
        .iter()
        .filter(|a| a.status == AppointmentStatus::Scheduled)
        .filter(|a| a.date.is_some_and(|d| d >= now))
        .min_by_key(|a| a.date)
}

/// Start of the next visit, or `None` when nothing is scheduled from `now` on.
pub fn next_visit(appointments: &[Appointment], now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    next_appointment(appointments, now).and_then(|a| a.date)
}
