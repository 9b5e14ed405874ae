use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use shared_database::DbError;
use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Cannot operate on a past date: {0}")]
    PastDate(NaiveDate),

    #[error("Slot is already taken")]
    SlotConflict,

    #[error("Clinician is not available at the requested time")]
    Unavailable,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Party is blacklisted: {0}")]
    Blacklisted(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Storage error: {0}")]
    Persistence(#[from] DbError),
}

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::Validation(msg) => AppError::ValidationError(msg),
            ScheduleError::PastDate(date) => {
                AppError::BadRequest(format!("Date {} is in the past", date))
            }
            ScheduleError::SlotConflict => {
                AppError::Conflict("The requested slot is already taken".to_string())
            }
            ScheduleError::Unavailable => AppError::BadRequest(
                "The clinician is not available at the requested time".to_string(),
            ),
            ScheduleError::NotFound(msg) => AppError::NotFound(msg),
            ScheduleError::Blacklisted(msg) => AppError::BadRequest(msg),
            ScheduleError::Forbidden(msg) => AppError::Forbidden(msg),
            ScheduleError::InvalidTransition { from, to } => {
                AppError::BadRequest(format!("Cannot move appointment from {} to {}", from, to))
            }
            ScheduleError::Persistence(e) => AppError::Database(e.to_string()),
        }
    }
}

/// Appointment lifecycle states.
///
/// Booked and Completed occupy their slot; Cancelled and Rescheduled free it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentStatus {
    Booked,
    Completed,
    Cancelled,
    Rescheduled,
}

impl AppointmentStatus {
    /// Whether an appointment in this state keeps its slot occupied.
    pub fn occupies_slot(&self) -> bool {
        matches!(self, AppointmentStatus::Booked | AppointmentStatus::Completed)
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AppointmentStatus::Booked)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Booked => write!(f, "Booked"),
            AppointmentStatus::Completed => write!(f, "Completed"),
            AppointmentStatus::Cancelled => write!(f, "Cancelled"),
            AppointmentStatus::Rescheduled => write!(f, "Rescheduled"),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown appointment status: {0}")]
pub struct ParseStatusError(String);

impl FromStr for AppointmentStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Booked" => Ok(AppointmentStatus::Booked),
            "Completed" => Ok(AppointmentStatus::Completed),
            "Cancelled" => Ok(AppointmentStatus::Cancelled),
            "Rescheduled" => Ok(AppointmentStatus::Rescheduled),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub clinician_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookSlotRequest {
    /// Required when an admin books on a patient's behalf; patients book for
    /// themselves and must omit it.
    pub patient_id: Option<Uuid>,
    pub clinician_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub reason: Option<String>,
}

/// Clinical notes attached to an appointment, usually on completion. One
/// record per appointment; a second write replaces the first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncounterRecord {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub notes: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EncounterUpsert {
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub notes: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub status: AppointmentStatus,
    pub encounter: Option<EncounterUpsert>,
}

#[derive(Debug, Deserialize)]
pub struct OverrideStatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct AppointmentSearchFilters {
    pub clinician_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
}

#[derive(Debug, Serialize)]
pub struct ScheduleStats {
    pub total: i64,
    pub booked: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub rescheduled: i64,
}

/// An appointment together with its encounter record, if one was written.
#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub appointment: Appointment,
    pub encounter: Option<EncounterRecord>,
}
