use chrono::{Days, NaiveDate, NaiveTime};
use rusqlite::{params, Row};
use tracing::info;
use uuid::Uuid;

use shared_database::ClinicStore;

use crate::models::{AvailabilityError, AvailabilityWindow, DaySchedule, DeclareWindowRequest};

/// Default windows seeded for a freshly registered clinician: a morning and
/// an afternoon block for each of the next seven days.
const DEFAULT_BLOCKS: [(&str, &str); 2] = [("09:00:00", "12:00:00"), ("14:00:00", "17:00:00")];
const DEFAULT_DAYS: u64 = 7;

/// The availability ledger. Append-only in spirit: windows are upserted by
/// natural key and closed by flipping `is_open`, never deleted.
pub struct AvailabilityLedger {
    store: ClinicStore,
}

impl AvailabilityLedger {
    pub fn new(store: ClinicStore) -> Self {
        Self { store }
    }

    /// Declare a window, replacing any previous declaration for the same
    /// (clinician, date, start time).
    pub fn declare_window(
        &self,
        clinician_id: Uuid,
        request: &DeclareWindowRequest,
    ) -> Result<AvailabilityWindow, AvailabilityError> {
        if request.start_time >= request.end_time {
            return Err(AvailabilityError::Validation(
                "Window start time must be before end time".to_string(),
            ));
        }

        self.store.with(|db| {
            let window = Self::upsert(db.conn(), clinician_id, request)?;
            info!(
                clinician_id = %clinician_id,
                date = %window.date,
                start = %window.start_time,
                "Availability window declared"
            );
            Ok(window)
        })
    }

    /// Declare several windows in one call. All-or-nothing is not needed
    /// here; each window is an independent upsert, but they share one lock
    /// acquisition.
    pub fn declare_windows(
        &self,
        clinician_id: Uuid,
        requests: &[DeclareWindowRequest],
    ) -> Result<Vec<AvailabilityWindow>, AvailabilityError> {
        for request in requests {
            if request.start_time >= request.end_time {
                return Err(AvailabilityError::Validation(
                    "Window start time must be before end time".to_string(),
                ));
            }
        }

        self.store.with(|db| {
            let mut declared = Vec::with_capacity(requests.len());
            for request in requests {
                declared.push(Self::upsert(db.conn(), clinician_id, request)?);
            }
            Ok(declared)
        })
    }

    /// Windows for a clinician, optionally narrowed to a single date,
    /// ordered by date then start time.
    pub fn list_windows(
        &self,
        clinician_id: Uuid,
        date: Option<NaiveDate>,
    ) -> Result<Vec<AvailabilityWindow>, AvailabilityError> {
        self.store.with(|db| {
            let conn = db.conn();
            let mut windows = Vec::new();
            match date {
                Some(date) => {
                    let mut stmt = conn.prepare(
                        "SELECT id, clinician_id, date, start_time, end_time, is_open
                         FROM availability_windows
                         WHERE clinician_id = ?1 AND date = ?2
                         ORDER BY start_time",
                    )?;
                    let rows = stmt.query_map(params![clinician_id, date], Self::from_row)?;
                    for row in rows {
                        windows.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT id, clinician_id, date, start_time, end_time, is_open
                         FROM availability_windows
                         WHERE clinician_id = ?1
                         ORDER BY date, start_time",
                    )?;
                    let rows = stmt.query_map(params![clinician_id], Self::from_row)?;
                    for row in rows {
                        windows.push(row?);
                    }
                }
            }
            Ok(windows)
        })
    }

    /// Seven days of windows starting at `from`, one entry per day including
    /// days with no declared windows.
    pub fn week_schedule(
        &self,
        clinician_id: Uuid,
        from: NaiveDate,
    ) -> Result<Vec<DaySchedule>, AvailabilityError> {
        let mut schedule = Vec::with_capacity(DEFAULT_DAYS as usize);
        for offset in 0..DEFAULT_DAYS {
            let date = from
                .checked_add_days(Days::new(offset))
                .ok_or_else(|| AvailabilityError::Validation("Date out of range".to_string()))?;
            let windows = self.list_windows(clinician_id, Some(date))?;
            schedule.push(DaySchedule { date, windows });
        }
        Ok(schedule)
    }

    /// Whether the clinician is open at the given instant. Boundaries are
    /// inclusive on both ends: a 09:00-12:00 window accepts 09:00 and 12:00.
    pub fn is_open_at(
        &self,
        clinician_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<bool, AvailabilityError> {
        self.store.with(|db| {
            let count: i64 = db.conn().query_row(
                "SELECT COUNT(*) FROM availability_windows
                 WHERE clinician_id = ?1 AND date = ?2 AND is_open = 1
                   AND start_time <= ?3 AND end_time >= ?3",
                params![clinician_id, date, time],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    /// Seed the default week of windows for a new clinician. Existing
    /// declarations with the same natural key are left untouched.
    pub fn seed_default_windows(
        &self,
        clinician_id: Uuid,
        from: NaiveDate,
    ) -> Result<(), AvailabilityError> {
        self.store
            .with(|db| Self::seed_default_windows_in(db.conn(), clinician_id, from))
    }

    /// Seed against an existing connection, so callers can run this inside
    /// the same transaction as the clinician insert.
    pub fn seed_default_windows_in(
        conn: &rusqlite::Connection,
        clinician_id: Uuid,
        from: NaiveDate,
    ) -> Result<(), AvailabilityError> {
        let mut stmt = conn.prepare(
            "INSERT INTO availability_windows (id, clinician_id, date, start_time, end_time, is_open)
             VALUES (?1, ?2, ?3, ?4, ?5, 1)
             ON CONFLICT (clinician_id, date, start_time) DO NOTHING",
        )?;
        for offset in 0..DEFAULT_DAYS {
            let date = from
                .checked_add_days(Days::new(offset))
                .ok_or_else(|| AvailabilityError::Validation("Date out of range".to_string()))?;
            for (start, end) in DEFAULT_BLOCKS {
                stmt.execute(params![Uuid::new_v4(), clinician_id, date, start, end])?;
            }
        }
        info!(clinician_id = %clinician_id, from = %from, "Seeded default availability");
        Ok(())
    }

    fn upsert(
        conn: &rusqlite::Connection,
        clinician_id: Uuid,
        request: &DeclareWindowRequest,
    ) -> Result<AvailabilityWindow, AvailabilityError> {
        conn.execute(
            "INSERT INTO availability_windows (id, clinician_id, date, start_time, end_time, is_open)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (clinician_id, date, start_time)
             DO UPDATE SET end_time = excluded.end_time, is_open = excluded.is_open",
            params![
                Uuid::new_v4(),
                clinician_id,
                request.date,
                request.start_time,
                request.end_time,
                request.is_open,
            ],
        )?;

        let window = conn.query_row(
            "SELECT id, clinician_id, date, start_time, end_time, is_open
             FROM availability_windows
             WHERE clinician_id = ?1 AND date = ?2 AND start_time = ?3",
            params![clinician_id, request.date, request.start_time],
            Self::from_row,
        )?;
        Ok(window)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<AvailabilityWindow> {
        Ok(AvailabilityWindow {
            id: row.get(0)?,
            clinician_id: row.get(1)?,
            date: row.get(2)?,
            start_time: row.get(3)?,
            end_time: row.get(4)?,
            is_open: row.get(5)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn test_store() -> ClinicStore {
        let store = ClinicStore::open_in_memory().unwrap();
        store
            .with::<_, shared_database::DbError>(|db| {
                db.conn()
                    .execute(
                        "INSERT INTO clinicians (id, full_name, email, specialty, created_at, updated_at)
                         VALUES (?1, 'Dr. Osei', 'osei@clinic.test', 'Cardiology', '', '')",
                        params![clinician()],
                    )
                    .map(|_| ())
                    .map_err(Into::into)
            })
            .unwrap();
        store
    }

    fn clinician() -> Uuid {
        Uuid::from_u128(0xA1)
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn time(s: &str) -> NaiveTime {
        s.parse().unwrap()
    }

    fn window(d: &str, start: &str, end: &str) -> DeclareWindowRequest {
        DeclareWindowRequest {
            date: date(d),
            start_time: time(start),
            end_time: time(end),
            is_open: true,
        }
    }

    #[test]
    fn declare_rejects_inverted_window() {
        let ledger = AvailabilityLedger::new(test_store());
        let result = ledger.declare_window(clinician(), &window("2030-06-01", "12:00:00", "09:00:00"));
        assert_matches!(result, Err(AvailabilityError::Validation(_)));
    }

    #[test]
    fn declare_upserts_by_natural_key() {
        let ledger = AvailabilityLedger::new(test_store());

        let first = ledger
            .declare_window(clinician(), &window("2030-06-01", "09:00:00", "12:00:00"))
            .unwrap();

        // Same key, new end time: replaces rather than duplicates.
        let mut replacement = window("2030-06-01", "09:00:00", "13:00:00");
        replacement.is_open = false;
        let second = ledger.declare_window(clinician(), &replacement).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.end_time, time("13:00:00"));
        assert!(!second.is_open);

        let all = ledger.list_windows(clinician(), None).unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn list_windows_is_ordered() {
        let ledger = AvailabilityLedger::new(test_store());
        ledger
            .declare_windows(
                clinician(),
                &[
                    window("2030-06-02", "09:00:00", "12:00:00"),
                    window("2030-06-01", "14:00:00", "17:00:00"),
                    window("2030-06-01", "09:00:00", "12:00:00"),
                ],
            )
            .unwrap();

        let all = ledger.list_windows(clinician(), None).unwrap();
        let keys: Vec<_> = all.iter().map(|w| (w.date, w.start_time)).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn open_check_is_inclusive_at_both_boundaries() {
        let ledger = AvailabilityLedger::new(test_store());
        ledger
            .declare_window(clinician(), &window("2030-06-01", "09:00:00", "12:00:00"))
            .unwrap();

        let d = date("2030-06-01");
        assert!(ledger.is_open_at(clinician(), d, time("09:00:00")).unwrap());
        assert!(ledger.is_open_at(clinician(), d, time("12:00:00")).unwrap());
        assert!(ledger.is_open_at(clinician(), d, time("10:30:00")).unwrap());
        assert!(!ledger.is_open_at(clinician(), d, time("08:59:59")).unwrap());
        assert!(!ledger.is_open_at(clinician(), d, time("12:00:01")).unwrap());
    }

    #[test]
    fn closed_window_does_not_count_as_open() {
        let ledger = AvailabilityLedger::new(test_store());
        let mut closed = window("2030-06-01", "09:00:00", "12:00:00");
        closed.is_open = false;
        ledger.declare_window(clinician(), &closed).unwrap();

        assert!(!ledger
            .is_open_at(clinician(), date("2030-06-01"), time("10:00:00"))
            .unwrap());
    }

    #[test]
    fn seed_covers_seven_days_of_two_blocks() {
        let ledger = AvailabilityLedger::new(test_store());
        ledger
            .seed_default_windows(clinician(), date("2030-06-01"))
            .unwrap();

        let all = ledger.list_windows(clinician(), None).unwrap();
        assert_eq!(all.len(), 14);

        // Seeding again must not clobber a clinician's own edit.
        let edited = ledger
            .declare_window(clinician(), &window("2030-06-01", "09:00:00", "10:00:00"))
            .unwrap();
        ledger
            .seed_default_windows(clinician(), date("2030-06-01"))
            .unwrap();
        let after = ledger.list_windows(clinician(), Some(date("2030-06-01"))).unwrap();
        let morning = after.iter().find(|w| w.id == edited.id).unwrap();
        assert_eq!(morning.end_time, time("10:00:00"));
    }

    #[test]
    fn week_schedule_spans_seven_days() {
        let ledger = AvailabilityLedger::new(test_store());
        ledger
            .seed_default_windows(clinician(), date("2030-06-01"))
            .unwrap();

        let schedule = ledger.week_schedule(clinician(), date("2030-06-01")).unwrap();
        assert_eq!(schedule.len(), 7);
        assert!(schedule.iter().all(|day| day.windows.len() == 2));
        assert_eq!(schedule[0].date, date("2030-06-01"));
        assert_eq!(schedule[6].date, date("2030-06-07"));
    }
}
