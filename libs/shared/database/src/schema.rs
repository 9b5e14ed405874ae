//! SQLite schema definition.

/// Complete database schema for the clinic store.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Directory: clinicians and patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS clinicians (
    id BLOB PRIMARY KEY,
    full_name TEXT NOT NULL,
    email TEXT UNIQUE NOT NULL,
    specialty TEXT NOT NULL,
    department TEXT,
    contact TEXT,
    qualification TEXT,
    experience_years INTEGER,
    status TEXT NOT NULL DEFAULT 'Active' CHECK (status IN ('Active', 'Blacklisted')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_clinicians_name ON clinicians(full_name);
CREATE INDEX IF NOT EXISTS idx_clinicians_specialty ON clinicians(specialty);

CREATE TABLE IF NOT EXISTS patients (
    id BLOB PRIMARY KEY,
    full_name TEXT NOT NULL,
    email TEXT UNIQUE NOT NULL,
    age INTEGER,
    gender TEXT CHECK (gender IN ('Male', 'Female', 'Other') OR gender IS NULL),
    contact TEXT,
    address TEXT,
    blood_group TEXT,
    emergency_contact TEXT,
    status TEXT NOT NULL DEFAULT 'Active' CHECK (status IN ('Active', 'Blacklisted')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(full_name);

-- ============================================================================
-- Availability ledger
-- ============================================================================

-- Natural key: one window per (clinician, date, start). Windows are never
-- deleted, only toggled closed via is_open.
CREATE TABLE IF NOT EXISTS availability_windows (
    id BLOB PRIMARY KEY,
    clinician_id BLOB NOT NULL REFERENCES clinicians(id) ON DELETE CASCADE,
    date TEXT NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT NOT NULL,
    is_open INTEGER NOT NULL DEFAULT 1,
    UNIQUE (clinician_id, date, start_time)
);

CREATE INDEX IF NOT EXISTS idx_windows_clinician_date
    ON availability_windows(clinician_id, date);

-- ============================================================================
-- Appointments
-- ============================================================================

CREATE TABLE IF NOT EXISTS appointments (
    id BLOB PRIMARY KEY,
    patient_id BLOB NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    clinician_id BLOB NOT NULL REFERENCES clinicians(id) ON DELETE CASCADE,
    appointment_date TEXT NOT NULL,
    appointment_time TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'Booked'
        CHECK (status IN ('Booked', 'Completed', 'Cancelled', 'Rescheduled')),
    reason TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- A slot is occupied while its appointment is Booked or Completed; Cancelled
-- and Rescheduled rows fall out of the index and free the slot for rebooking.
-- This constraint is what makes concurrent bookings of one slot lose cleanly.
CREATE UNIQUE INDEX IF NOT EXISTS idx_appointments_live_slot
    ON appointments(clinician_id, appointment_date, appointment_time)
    WHERE status IN ('Booked', 'Completed');

CREATE INDEX IF NOT EXISTS idx_appointments_patient ON appointments(patient_id);
CREATE INDEX IF NOT EXISTS idx_appointments_clinician_date
    ON appointments(clinician_id, appointment_date);

-- ============================================================================
-- Encounter records (1:1 with appointments)
-- ============================================================================

CREATE TABLE IF NOT EXISTS encounters (
    id BLOB PRIMARY KEY,
    appointment_id BLOB UNIQUE NOT NULL REFERENCES appointments(id) ON DELETE CASCADE,
    diagnosis TEXT,
    prescription TEXT,
    notes TEXT,
    follow_up_date TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;
