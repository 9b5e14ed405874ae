use rusqlite::{params, Row, ToSql};
use uuid::Uuid;

use shared_database::{ClinicStore, DbError};

use crate::models::{
    Appointment, AppointmentSearchFilters, EncounterRecord, HistoryEntry, ScheduleError,
    ScheduleStats,
};
use crate::services::booking::SchedulingEngine;

/// Read side of the schedule: filtered searches, per-party listings and
/// aggregate counts. No authorization here; handlers scope the filters to
/// the caller before asking.
pub struct ScheduleQueryService {
    store: ClinicStore,
}

impl ScheduleQueryService {
    pub fn new(store: ClinicStore) -> Self {
        Self { store }
    }

    /// Appointments matching the filters, ordered by date then time.
    pub fn search(
        &self,
        filters: &AppointmentSearchFilters,
    ) -> Result<Vec<Appointment>, ScheduleError> {
        let mut sql = String::from(
            "SELECT id, patient_id, clinician_id, appointment_date, appointment_time,
                    status, reason, created_at, updated_at
             FROM appointments WHERE 1=1",
        );
        let mut args: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(clinician_id) = filters.clinician_id {
            sql.push_str(" AND clinician_id = ?");
            args.push(Box::new(clinician_id));
        }
        if let Some(patient_id) = filters.patient_id {
            sql.push_str(" AND patient_id = ?");
            args.push(Box::new(patient_id));
        }
        if let Some(date) = filters.date {
            sql.push_str(" AND appointment_date = ?");
            args.push(Box::new(date));
        }
        if let Some(status) = filters.status {
            sql.push_str(" AND status = ?");
            args.push(Box::new(status.to_string()));
        }
        sql.push_str(" ORDER BY appointment_date, appointment_time");

        self.store.with(|db| {
            let mut stmt = db.conn().prepare(&sql).map_err(DbError::from)?;
            let rows = stmt
                .query_map(
                    rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
                    SchedulingEngine::from_row,
                )
                .map_err(DbError::from)?;
            let mut appointments = Vec::new();
            for row in rows {
                appointments.push(row.map_err(DbError::from)?);
            }
            Ok(appointments)
        })
    }

    /// A patient's appointments with their encounter records, oldest first.
    pub fn patient_history(&self, patient_id: Uuid) -> Result<Vec<HistoryEntry>, ScheduleError> {
        self.store.with(|db| {
            let mut stmt = db
                .conn()
                .prepare(
                    "SELECT a.id, a.patient_id, a.clinician_id, a.appointment_date,
                            a.appointment_time, a.status, a.reason, a.created_at, a.updated_at,
                            e.id, e.appointment_id, e.diagnosis, e.prescription, e.notes,
                            e.follow_up_date, e.created_at, e.updated_at
                     FROM appointments a
                     LEFT JOIN encounters e ON e.appointment_id = a.id
                     WHERE a.patient_id = ?1
                     ORDER BY a.appointment_date, a.appointment_time",
                )
                .map_err(DbError::from)?;
            let rows = stmt
                .query_map(params![patient_id], Self::history_from_row)
                .map_err(DbError::from)?;
            let mut history = Vec::new();
            for row in rows {
                history.push(row.map_err(DbError::from)?);
            }
            Ok(history)
        })
    }

    pub fn stats(&self) -> Result<ScheduleStats, ScheduleError> {
        self.store.with(|db| {
            let conn = db.conn();
            let count_status = |status: &str| -> Result<i64, ScheduleError> {
                conn.query_row(
                    "SELECT COUNT(*) FROM appointments WHERE status = ?1",
                    params![status],
                    |row| row.get(0),
                )
                .map_err(|e| ScheduleError::Persistence(e.into()))
            };
            let total: i64 = conn
                .query_row("SELECT COUNT(*) FROM appointments", [], |row| row.get(0))
                .map_err(DbError::from)?;
            Ok(ScheduleStats {
                total,
                booked: count_status("Booked")?,
                completed: count_status("Completed")?,
                cancelled: count_status("Cancelled")?,
                rescheduled: count_status("Rescheduled")?,
            })
        })
    }

    fn history_from_row(row: &Row<'_>) -> rusqlite::Result<HistoryEntry> {
        let appointment = SchedulingEngine::from_row(row)?;
        let encounter_id: Option<Uuid> = row.get(9)?;
        let encounter = match encounter_id {
            Some(id) => Some(EncounterRecord {
                id,
                appointment_id: row.get(10)?,
                diagnosis: row.get(11)?,
                prescription: row.get(12)?,
                notes: row.get(13)?,
                follow_up_date: row.get(14)?,
                created_at: row.get(15)?,
                updated_at: row.get(16)?,
            }),
            None => None,
        };
        Ok(HistoryEntry {
            appointment,
            encounter,
        })
    }
}
