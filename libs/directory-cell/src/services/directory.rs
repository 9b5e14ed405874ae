use chrono::Utc;
use rusqlite::{params, types::Type, Row};
use tracing::info;
use uuid::Uuid;

use availability_cell::models::AvailabilityError;
use availability_cell::services::AvailabilityLedger;
use shared_database::ClinicStore;

use crate::models::{
    Clinician, DirectoryError, DirectoryStats, Patient, PartyStatus, RegisterClinicianRequest,
    RegisterPatientRequest, UpdateClinicianRequest, UpdatePatientRequest,
};

/// Registry of clinicians and patients. Entries are soft-deleted only: a
/// blacklisted party keeps its id and history but is barred from new
/// bookings by the scheduling engine.
pub struct DirectoryService {
    store: ClinicStore,
}

impl DirectoryService {
    pub fn new(store: ClinicStore) -> Self {
        Self { store }
    }

    pub fn register_clinician(
        &self,
        request: &RegisterClinicianRequest,
    ) -> Result<Clinician, DirectoryError> {
        if request.full_name.trim().is_empty()
            || request.email.trim().is_empty()
            || request.specialty.trim().is_empty()
        {
            return Err(DirectoryError::Validation(
                "Name, email and specialty are required".to_string(),
            ));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        // Insert and default-window seeding commit together; a failed seed
        // leaves no clinician row behind.
        self.store.with_mut(|db| -> Result<(), DirectoryError> {
            let tx = db.transaction()?;
            tx.execute(
                "INSERT INTO clinicians
                 (id, full_name, email, specialty, department, contact, qualification,
                  experience_years, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'Active', ?9, ?9)",
                params![
                    id,
                    request.full_name.trim(),
                    request.email.trim(),
                    request.specialty.trim(),
                    request.department,
                    request.contact,
                    request.qualification,
                    request.experience_years,
                    now,
                ],
            )
            .map_err(|e| Self::map_duplicate(e, &request.email))?;

            AvailabilityLedger::seed_default_windows_in(&tx, id, now.date_naive()).map_err(
                |e| match e {
                    AvailabilityError::Persistence(db) => DirectoryError::Persistence(db),
                    other => DirectoryError::Validation(other.to_string()),
                },
            )?;

            tx.commit()?;
            Ok(())
        })?;

        info!(clinician_id = %id, "Clinician registered");
        self.get_clinician(id)
    }

    pub fn register_patient(
        &self,
        request: &RegisterPatientRequest,
    ) -> Result<Patient, DirectoryError> {
        if request.full_name.trim().is_empty() || request.email.trim().is_empty() {
            return Err(DirectoryError::Validation(
                "Name and email are required".to_string(),
            ));
        }
        if let Some(age) = request.age {
            if !(0..=130).contains(&age) {
                return Err(DirectoryError::Validation(
                    "Age must be between 0 and 130".to_string(),
                ));
            }
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        self.store.with(|db| -> Result<(), DirectoryError> {
            db.conn()
                .execute(
                    "INSERT INTO patients
                     (id, full_name, email, age, gender, contact, address, blood_group,
                      emergency_contact, status, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'Active', ?10, ?10)",
                    params![
                        id,
                        request.full_name.trim(),
                        request.email.trim(),
                        request.age,
                        request.gender.map(|g| g.to_string()),
                        request.contact,
                        request.address,
                        request.blood_group,
                        request.emergency_contact,
                        now,
                    ],
                )
                .map_err(|e| Self::map_duplicate(e, &request.email))?;
            Ok(())
        })?;

        info!(patient_id = %id, "Patient registered");
        self.get_patient(id)
    }

    pub fn update_clinician(
        &self,
        id: Uuid,
        request: &UpdateClinicianRequest,
    ) -> Result<Clinician, DirectoryError> {
        let now = Utc::now();
        self.store.with(|db| {
            let changed = db
                .conn()
                .execute(
                    "UPDATE clinicians SET
                         full_name = COALESCE(?2, full_name),
                         email = COALESCE(?3, email),
                         specialty = COALESCE(?4, specialty),
                         department = COALESCE(?5, department),
                         contact = COALESCE(?6, contact),
                         qualification = COALESCE(?7, qualification),
                         experience_years = COALESCE(?8, experience_years),
                         updated_at = ?9
                     WHERE id = ?1",
                    params![
                        id,
                        request.full_name,
                        request.email,
                        request.specialty,
                        request.department,
                        request.contact,
                        request.qualification,
                        request.experience_years,
                        now,
                    ],
                )
                .map_err(|e| Self::map_duplicate(e, request.email.as_deref().unwrap_or("")))?;
            if changed == 0 {
                return Err(DirectoryError::NotFound(format!("Clinician {} not found", id)));
            }
            Ok(())
        })?;
        self.get_clinician(id)
    }

    pub fn update_patient(
        &self,
        id: Uuid,
        request: &UpdatePatientRequest,
    ) -> Result<Patient, DirectoryError> {
        let now = Utc::now();
        self.store.with(|db| {
            let changed = db
                .conn()
                .execute(
                    "UPDATE patients SET
                         full_name = COALESCE(?2, full_name),
                         email = COALESCE(?3, email),
                         age = COALESCE(?4, age),
                         gender = COALESCE(?5, gender),
                         contact = COALESCE(?6, contact),
                         address = COALESCE(?7, address),
                         blood_group = COALESCE(?8, blood_group),
                         emergency_contact = COALESCE(?9, emergency_contact),
                         updated_at = ?10
                     WHERE id = ?1",
                    params![
                        id,
                        request.full_name,
                        request.email,
                        request.age,
                        request.gender.map(|g| g.to_string()),
                        request.contact,
                        request.address,
                        request.blood_group,
                        request.emergency_contact,
                        now,
                    ],
                )
                .map_err(|e| Self::map_duplicate(e, request.email.as_deref().unwrap_or("")))?;
            if changed == 0 {
                return Err(DirectoryError::NotFound(format!("Patient {} not found", id)));
            }
            Ok(())
        })?;
        self.get_patient(id)
    }

    pub fn set_clinician_status(
        &self,
        id: Uuid,
        status: PartyStatus,
    ) -> Result<Clinician, DirectoryError> {
        self.set_status("clinicians", id, status)?;
        info!(clinician_id = %id, status = %status, "Clinician status changed");
        self.get_clinician(id)
    }

    pub fn set_patient_status(
        &self,
        id: Uuid,
        status: PartyStatus,
    ) -> Result<Patient, DirectoryError> {
        self.set_status("patients", id, status)?;
        info!(patient_id = %id, status = %status, "Patient status changed");
        self.get_patient(id)
    }

    fn set_status(&self, table: &str, id: Uuid, status: PartyStatus) -> Result<(), DirectoryError> {
        self.store.with(|db| {
            let changed = db.conn().execute(
                &format!("UPDATE {} SET status = ?2, updated_at = ?3 WHERE id = ?1", table),
                params![id, status.to_string(), Utc::now()],
            )?;
            if changed == 0 {
                return Err(DirectoryError::NotFound(format!("{} not found", id)));
            }
            Ok(())
        })
    }

    pub fn get_clinician(&self, id: Uuid) -> Result<Clinician, DirectoryError> {
        self.store.with(|db| {
            db.conn()
                .query_row(
                    "SELECT id, full_name, email, specialty, department, contact, qualification,
                            experience_years, status, created_at, updated_at
                     FROM clinicians WHERE id = ?1",
                    params![id],
                    Self::clinician_from_row,
                )
                .map_err(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => {
                        DirectoryError::NotFound(format!("Clinician {} not found", id))
                    }
                    other => DirectoryError::Persistence(other.into()),
                })
        })
    }

    pub fn get_patient(&self, id: Uuid) -> Result<Patient, DirectoryError> {
        self.store.with(|db| {
            db.conn()
                .query_row(
                    "SELECT id, full_name, email, age, gender, contact, address, blood_group,
                            emergency_contact, status, created_at, updated_at
                     FROM patients WHERE id = ?1",
                    params![id],
                    Self::patient_from_row,
                )
                .map_err(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => {
                        DirectoryError::NotFound(format!("Patient {} not found", id))
                    }
                    other => DirectoryError::Persistence(other.into()),
                })
        })
    }

    /// Clinicians matching an optional name/specialty substring, ordered by
    /// name.
    pub fn list_clinicians(&self, search: Option<&str>) -> Result<Vec<Clinician>, DirectoryError> {
        let pattern = format!("%{}%", search.unwrap_or(""));
        self.store.with(|db| {
            let mut stmt = db.conn().prepare(
                "SELECT id, full_name, email, specialty, department, contact, qualification,
                        experience_years, status, created_at, updated_at
                 FROM clinicians
                 WHERE full_name LIKE ?1 OR specialty LIKE ?1
                 ORDER BY full_name",
            )?;
            let rows = stmt.query_map(params![pattern], Self::clinician_from_row)?;
            let mut clinicians = Vec::new();
            for row in rows {
                clinicians.push(row?);
            }
            Ok(clinicians)
        })
    }

    pub fn list_patients(&self, search: Option<&str>) -> Result<Vec<Patient>, DirectoryError> {
        let pattern = format!("%{}%", search.unwrap_or(""));
        self.store.with(|db| {
            let mut stmt = db.conn().prepare(
                "SELECT id, full_name, email, age, gender, contact, address, blood_group,
                        emergency_contact, status, created_at, updated_at
                 FROM patients
                 WHERE full_name LIKE ?1 OR email LIKE ?1
                 ORDER BY full_name",
            )?;
            let rows = stmt.query_map(params![pattern], Self::patient_from_row)?;
            let mut patients = Vec::new();
            for row in rows {
                patients.push(row?);
            }
            Ok(patients)
        })
    }

    pub fn stats(&self) -> Result<DirectoryStats, DirectoryError> {
        self.store.with(|db| {
            let conn = db.conn();
            let count = |sql: &str| -> Result<i64, DirectoryError> {
                conn.query_row(sql, [], |row| row.get(0))
                    .map_err(|e| DirectoryError::Persistence(e.into()))
            };
            Ok(DirectoryStats {
                active_clinicians: count("SELECT COUNT(*) FROM clinicians WHERE status = 'Active'")?,
                blacklisted_clinicians: count(
                    "SELECT COUNT(*) FROM clinicians WHERE status = 'Blacklisted'",
                )?,
                active_patients: count("SELECT COUNT(*) FROM patients WHERE status = 'Active'")?,
                blacklisted_patients: count(
                    "SELECT COUNT(*) FROM patients WHERE status = 'Blacklisted'",
                )?,
            })
        })
    }

    fn map_duplicate(e: rusqlite::Error, email: &str) -> DirectoryError {
        let db_err: shared_database::DbError = e.into();
        if db_err.is_constraint_violation() {
            DirectoryError::Duplicate(format!("Email {} is already registered", email))
        } else {
            DirectoryError::Persistence(db_err)
        }
    }

    fn clinician_from_row(row: &Row<'_>) -> rusqlite::Result<Clinician> {
        let status: String = row.get(8)?;
        Ok(Clinician {
            id: row.get(0)?,
            full_name: row.get(1)?,
            email: row.get(2)?,
            specialty: row.get(3)?,
            department: row.get(4)?,
            contact: row.get(5)?,
            qualification: row.get(6)?,
            experience_years: row.get(7)?,
            status: status
                .parse()
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(e)))?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
        let gender: Option<String> = row.get(4)?;
        let status: String = row.get(9)?;
        Ok(Patient {
            id: row.get(0)?,
            full_name: row.get(1)?,
            email: row.get(2)?,
            age: row.get(3)?,
            gender: gender
                .map(|g| {
                    g.parse().map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e))
                    })
                })
                .transpose()?,
            contact: row.get(5)?,
            address: row.get(6)?,
            blood_group: row.get(7)?,
            emergency_contact: row.get(8)?,
            status: status
                .parse()
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(e)))?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }
}
