use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::DbError;
use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum AvailabilityError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Persistence(#[from] DbError),
}

impl From<rusqlite::Error> for AvailabilityError {
    fn from(e: rusqlite::Error) -> Self {
        AvailabilityError::Persistence(e.into())
    }
}

impl From<AvailabilityError> for AppError {
    fn from(err: AvailabilityError) -> Self {
        match err {
            AvailabilityError::Validation(msg) => AppError::ValidationError(msg),
            AvailabilityError::NotFound(msg) => AppError::NotFound(msg),
            AvailabilityError::Persistence(e) => AppError::Database(e.to_string()),
        }
    }
}

/// A block of time a clinician has declared themselves open for bookings.
///
/// Windows are keyed by (clinician, date, start time); declaring the same key
/// again replaces the end time and open flag rather than stacking a duplicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub id: Uuid,
    pub clinician_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_open: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeclareWindowRequest {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default = "default_open")]
    pub is_open: bool,
}

fn default_open() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct DeclareWindowsRequest {
    pub windows: Vec<DeclareWindowRequest>,
}

/// One day of a clinician's week view.
#[derive(Debug, Serialize)]
pub struct DaySchedule {
    pub date: NaiveDate,
    pub windows: Vec<AvailabilityWindow>,
}
