//! Appointment status lifecycle rules.
//!
//! Booked is the only live state. The three terminal states differ in what
//! they mean for the slot and the record, but none of them can move again
//! except through an admin override.

use crate::models::{AppointmentStatus, ScheduleError};

/// States an appointment may move to from `from`, for non-admin callers.
pub fn valid_transitions(from: AppointmentStatus) -> &'static [AppointmentStatus] {
    if from.is_terminal() {
        &[]
    } else {
        &[
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::Rescheduled,
        ]
    }
}

pub fn validate_transition(
    from: AppointmentStatus,
    to: AppointmentStatus,
) -> Result<(), ScheduleError> {
    if valid_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(ScheduleError::InvalidTransition { from, to })
    }
}
