use chrono::Utc;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use shared_database::ClinicStore;

use crate::models::{EncounterRecord, EncounterUpsert, ScheduleError};

/// Encounter records: the clinical notes written when an appointment
/// completes. Exactly one per appointment; rewriting replaces the record in
/// place and keeps its id.
pub struct EncounterService {
    store: ClinicStore,
}

impl EncounterService {
    pub fn new(store: ClinicStore) -> Self {
        Self { store }
    }

    pub fn upsert(
        &self,
        appointment_id: Uuid,
        payload: &EncounterUpsert,
    ) -> Result<EncounterRecord, ScheduleError> {
        self.store
            .with(|db| Self::upsert_in(db.conn(), appointment_id, payload))
    }

    pub fn get_by_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<EncounterRecord, ScheduleError> {
        self.store.with(|db| {
            Self::find_in(db.conn(), appointment_id)?.ok_or_else(|| {
                ScheduleError::NotFound(format!(
                    "No encounter record for appointment {}",
                    appointment_id
                ))
            })
        })
    }

    /// Upsert against an existing connection, so the booking engine can run
    /// this inside the same transaction as a status change.
    pub(crate) fn upsert_in(
        conn: &Connection,
        appointment_id: Uuid,
        payload: &EncounterUpsert,
    ) -> Result<EncounterRecord, ScheduleError> {
        let now = Utc::now();
        conn.execute(
            "INSERT INTO encounters
             (id, appointment_id, diagnosis, prescription, notes, follow_up_date,
              created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
             ON CONFLICT (appointment_id) DO UPDATE SET
                 diagnosis = excluded.diagnosis,
                 prescription = excluded.prescription,
                 notes = excluded.notes,
                 follow_up_date = excluded.follow_up_date,
                 updated_at = excluded.updated_at",
            params![
                Uuid::new_v4(),
                appointment_id,
                payload.diagnosis,
                payload.prescription,
                payload.notes,
                payload.follow_up_date,
                now,
            ],
        )
        .map_err(shared_database::DbError::from)?;

        Self::find_in(conn, appointment_id)?.ok_or_else(|| {
            ScheduleError::NotFound(format!(
                "No encounter record for appointment {}",
                appointment_id
            ))
        })
    }

    pub(crate) fn find_in(
        conn: &Connection,
        appointment_id: Uuid,
    ) -> Result<Option<EncounterRecord>, ScheduleError> {
        let mut stmt = conn
            .prepare(
                "SELECT id, appointment_id, diagnosis, prescription, notes, follow_up_date,
                        created_at, updated_at
                 FROM encounters WHERE appointment_id = ?1",
            )
            .map_err(shared_database::DbError::from)?;
        let mut rows = stmt
            .query_map(params![appointment_id], Self::from_row)
            .map_err(shared_database::DbError::from)?;
        match rows.next() {
            Some(row) => Ok(Some(row.map_err(shared_database::DbError::from)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<EncounterRecord> {
        Ok(EncounterRecord {
            id: row.get(0)?,
            appointment_id: row.get(1)?,
            diagnosis: row.get(2)?,
            prescription: row.get(3)?,
            notes: row.get(4)?,
            follow_up_date: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}
