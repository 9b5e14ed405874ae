use chrono::{NaiveDate, NaiveTime, Utc};
use rusqlite::{params, types::Type, Connection, Row};
use tracing::{info, warn};
use uuid::Uuid;

use shared_database::{ClinicStore, DbError};
use shared_models::auth::{Actor, Role};

use crate::models::{
    Appointment, AppointmentStatus, BookSlotRequest, EncounterRecord, ScheduleError,
    TransitionRequest,
};
use crate::services::encounter::EncounterService;
use crate::services::lifecycle;

/// The scheduling engine. Every write path runs its full
/// check-then-write sequence under one store lock acquisition, and the
/// live-slot unique index closes the race a second time at insert.
pub struct SchedulingEngine {
    store: ClinicStore,
}

impl SchedulingEngine {
    pub fn new(store: ClinicStore) -> Self {
        Self { store }
    }

    /// Book a slot. The checks run in a fixed order so the caller always
    /// gets the most specific error: past date, unknown or blacklisted
    /// parties, slot conflict, then availability.
    pub fn book_slot(
        &self,
        actor: &Actor,
        request: &BookSlotRequest,
    ) -> Result<Appointment, ScheduleError> {
        let patient_id = Self::resolve_patient(actor, request)?;

        if request.appointment_date < Utc::now().date_naive() {
            return Err(ScheduleError::PastDate(request.appointment_date));
        }

        self.store.with(|db| {
            let conn = db.conn();

            Self::ensure_bookable(conn, "clinicians", request.clinician_id, "Clinician")?;
            Self::ensure_bookable(conn, "patients", patient_id, "Patient")?;

            if Self::slot_taken(
                conn,
                request.clinician_id,
                request.appointment_date,
                request.appointment_time,
            )? {
                return Err(ScheduleError::SlotConflict);
            }

            if !Self::clinician_open_at(
                conn,
                request.clinician_id,
                request.appointment_date,
                request.appointment_time,
            )? {
                return Err(ScheduleError::Unavailable);
            }

            let id = Uuid::new_v4();
            let now = Utc::now();
            conn.execute(
                "INSERT INTO appointments
                 (id, patient_id, clinician_id, appointment_date, appointment_time,
                  status, reason, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'Booked', ?6, ?7, ?7)",
                params![
                    id,
                    patient_id,
                    request.clinician_id,
                    request.appointment_date,
                    request.appointment_time,
                    request.reason,
                    now,
                ],
            )
            .map_err(|e| {
                let db_err: DbError = e.into();
                if db_err.is_constraint_violation() {
                    // Lost the race despite the pre-check.
                    warn!(
                        clinician_id = %request.clinician_id,
                        date = %request.appointment_date,
                        "Booking insert hit the live-slot index"
                    );
                    ScheduleError::SlotConflict
                } else {
                    ScheduleError::Persistence(db_err)
                }
            })?;

            info!(
                appointment_id = %id,
                patient_id = %patient_id,
                clinician_id = %request.clinician_id,
                date = %request.appointment_date,
                time = %request.appointment_time,
                "Slot booked"
            );
            Self::load(conn, id)
        })
    }

    /// Cancel an appointment, freeing its slot. Cancelling an already
    /// cancelled appointment is a no-op rather than an error.
    pub fn cancel_slot(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
    ) -> Result<Appointment, ScheduleError> {
        self.store.with(|db| {
            let conn = db.conn();
            let appointment = Self::load(conn, appointment_id)?;
            Self::ensure_party(actor, &appointment)?;

            if appointment.status == AppointmentStatus::Cancelled {
                return Ok(appointment);
            }

            if appointment.appointment_date < Utc::now().date_naive() {
                return Err(ScheduleError::PastDate(appointment.appointment_date));
            }

            lifecycle::validate_transition(appointment.status, AppointmentStatus::Cancelled)?;

            Self::set_status(conn, appointment_id, AppointmentStatus::Cancelled)?;
            info!(appointment_id = %appointment_id, "Appointment cancelled");
            Self::load(conn, appointment_id)
        })
    }

    /// Move an appointment through the lifecycle, writing the encounter
    /// record in the same transaction when one is supplied. Only the
    /// treating clinician or an admin may do this.
    pub fn transition_with_encounter(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
        request: &TransitionRequest,
    ) -> Result<(Appointment, Option<EncounterRecord>), ScheduleError> {
        if actor.role == Role::Patient {
            return Err(ScheduleError::Forbidden(
                "Patients cannot transition appointments".to_string(),
            ));
        }

        self.store.with_mut(|db| {
            let tx = db.transaction()?;

            let appointment = Self::load(&tx, appointment_id)?;
            if actor.role == Role::Clinician && actor.id != appointment.clinician_id {
                return Err(ScheduleError::Forbidden(
                    "Only the treating clinician can transition this appointment".to_string(),
                ));
            }

            lifecycle::validate_transition(appointment.status, request.status)?;

            Self::set_status(&tx, appointment_id, request.status)?;
            let record = match &request.encounter {
                Some(payload) => Some(EncounterService::upsert_in(&tx, appointment_id, payload)?),
                None => None,
            };
            let updated = Self::load(&tx, appointment_id)?;

            tx.commit().map_err(DbError::from)?;

            info!(
                appointment_id = %appointment_id,
                status = %request.status,
                with_encounter = record.is_some(),
                "Appointment transitioned"
            );
            Ok((updated, record))
        })
    }

    /// Admin-only escape hatch: set any status regardless of the lifecycle
    /// table. Used to fix records the normal flow cannot reach.
    pub fn override_status(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, ScheduleError> {
        if !actor.is_admin() {
            return Err(ScheduleError::Forbidden(
                "Only admins can override appointment status".to_string(),
            ));
        }

        self.store.with(|db| {
            let conn = db.conn();
            let appointment = Self::load(conn, appointment_id)?;
            if appointment.status == status {
                return Ok(appointment);
            }
            Self::set_status(conn, appointment_id, status)?;
            warn!(
                appointment_id = %appointment_id,
                from = %appointment.status,
                to = %status,
                "Admin status override"
            );
            Self::load(conn, appointment_id)
        })
    }

    pub fn get_appointment(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
    ) -> Result<Appointment, ScheduleError> {
        self.store.with(|db| {
            let appointment = Self::load(db.conn(), appointment_id)?;
            Self::ensure_party(actor, &appointment)?;
            Ok(appointment)
        })
    }

    fn resolve_patient(actor: &Actor, request: &BookSlotRequest) -> Result<Uuid, ScheduleError> {
        match actor.role {
            Role::Patient => match request.patient_id {
                Some(id) if id != actor.id => Err(ScheduleError::Forbidden(
                    "Patients can only book for themselves".to_string(),
                )),
                _ => Ok(actor.id),
            },
            Role::Admin => request.patient_id.ok_or_else(|| {
                ScheduleError::Validation(
                    "patient_id is required when booking on a patient's behalf".to_string(),
                )
            }),
            Role::Clinician => Err(ScheduleError::Forbidden(
                "Clinicians cannot book appointments".to_string(),
            )),
        }
    }

    /// Admins see everything; patients and clinicians only their own.
    fn ensure_party(actor: &Actor, appointment: &Appointment) -> Result<(), ScheduleError> {
        let allowed = match actor.role {
            Role::Admin => true,
            Role::Patient => actor.id == appointment.patient_id,
            Role::Clinician => actor.id == appointment.clinician_id,
        };
        if allowed {
            Ok(())
        } else {
            Err(ScheduleError::Forbidden(
                "Not a party to this appointment".to_string(),
            ))
        }
    }

    fn ensure_bookable(
        conn: &Connection,
        table: &str,
        id: Uuid,
        label: &str,
    ) -> Result<(), ScheduleError> {
        let status: String = conn
            .query_row(
                &format!("SELECT status FROM {} WHERE id = ?1", table),
                params![id],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    ScheduleError::NotFound(format!("{} {} not found", label, id))
                }
                other => ScheduleError::Persistence(other.into()),
            })?;
        if status == "Blacklisted" {
            return Err(ScheduleError::Blacklisted(format!(
                "{} {} is blacklisted",
                label, id
            )));
        }
        Ok(())
    }

    fn slot_taken(
        conn: &Connection,
        clinician_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<bool, ScheduleError> {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM appointments
                 WHERE clinician_id = ?1 AND appointment_date = ?2 AND appointment_time = ?3
                   AND status IN ('Booked', 'Completed')",
                params![clinician_id, date, time],
                |row| row.get(0),
            )
            .map_err(DbError::from)?;
        Ok(count > 0)
    }

    // Same predicate as the availability ledger's open check; inlined here
    // because this runs while the store lock is already held.
    fn clinician_open_at(
        conn: &Connection,
        clinician_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<bool, ScheduleError> {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM availability_windows
                 WHERE clinician_id = ?1 AND date = ?2 AND is_open = 1
                   AND start_time <= ?3 AND end_time >= ?3",
                params![clinician_id, date, time],
                |row| row.get(0),
            )
            .map_err(DbError::from)?;
        Ok(count > 0)
    }

    fn set_status(
        conn: &Connection,
        appointment_id: Uuid,
        status: AppointmentStatus,
    ) -> Result<(), ScheduleError> {
        conn.execute(
            "UPDATE appointments SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![appointment_id, status.to_string(), Utc::now()],
        )
        .map_err(DbError::from)?;
        Ok(())
    }

    pub(crate) fn load(conn: &Connection, id: Uuid) -> Result<Appointment, ScheduleError> {
        conn.query_row(
            "SELECT id, patient_id, clinician_id, appointment_date, appointment_time,
                    status, reason, created_at, updated_at
             FROM appointments WHERE id = ?1",
            params![id],
            Self::from_row,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                ScheduleError::NotFound(format!("Appointment {} not found", id))
            }
            other => ScheduleError::Persistence(other.into()),
        })
    }

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
        let status: String = row.get(5)?;
        Ok(Appointment {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            clinician_id: row.get(2)?,
            appointment_date: row.get(3)?,
            appointment_time: row.get(4)?,
            status: status
                .parse()
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?,
            reason: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}
