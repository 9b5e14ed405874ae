use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use shared_database::DbError;
use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already registered: {0}")]
    Duplicate(String),

    #[error("Storage error: {0}")]
    Persistence(#[from] DbError),
}

impl From<rusqlite::Error> for DirectoryError {
    fn from(e: rusqlite::Error) -> Self {
        DirectoryError::Persistence(e.into())
    }
}

impl From<DirectoryError> for AppError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Validation(msg) => AppError::ValidationError(msg),
            DirectoryError::NotFound(msg) => AppError::NotFound(msg),
            DirectoryError::Duplicate(msg) => AppError::Conflict(msg),
            DirectoryError::Persistence(e) => AppError::Database(e.to_string()),
        }
    }
}

/// Lifecycle status for directory entries. Parties are never deleted;
/// blacklisting hides them from new bookings while their history stays put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartyStatus {
    Active,
    Blacklisted,
}

impl fmt::Display for PartyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartyStatus::Active => write!(f, "Active"),
            PartyStatus::Blacklisted => write!(f, "Blacklisted"),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown party status: {0}")]
pub struct ParsePartyStatusError(String);

impl FromStr for PartyStatus {
    type Err = ParsePartyStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(PartyStatus::Active),
            "Blacklisted" => Ok(PartyStatus::Blacklisted),
            other => Err(ParsePartyStatusError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "Male"),
            Gender::Female => write!(f, "Female"),
            Gender::Other => write!(f, "Other"),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown gender: {0}")]
pub struct ParseGenderError(String);

impl FromStr for Gender {
    type Err = ParseGenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Male" => Ok(Gender::Male),
            "Female" => Ok(Gender::Female),
            "Other" => Ok(Gender::Other),
            other => Err(ParseGenderError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clinician {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub specialty: String,
    pub department: Option<String>,
    pub contact: Option<String>,
    pub qualification: Option<String>,
    pub experience_years: Option<i64>,
    pub status: PartyStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub age: Option<i64>,
    pub gender: Option<Gender>,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub blood_group: Option<String>,
    pub emergency_contact: Option<String>,
    pub status: PartyStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterClinicianRequest {
    pub full_name: String,
    pub email: String,
    pub specialty: String,
    pub department: Option<String>,
    pub contact: Option<String>,
    pub qualification: Option<String>,
    pub experience_years: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateClinicianRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub specialty: Option<String>,
    pub department: Option<String>,
    pub contact: Option<String>,
    pub qualification: Option<String>,
    pub experience_years: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterPatientRequest {
    pub full_name: String,
    pub email: String,
    pub age: Option<i64>,
    pub gender: Option<Gender>,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub blood_group: Option<String>,
    pub emergency_contact: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePatientRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<Gender>,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub blood_group: Option<String>,
    pub emergency_contact: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: PartyStatus,
}

#[derive(Debug, Serialize)]
pub struct DirectoryStats {
    pub active_clinicians: i64,
    pub blacklisted_clinicians: i64,
    pub active_patients: i64,
    pub blacklisted_patients: i64,
}
