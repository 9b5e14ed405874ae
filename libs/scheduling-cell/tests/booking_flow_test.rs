use std::thread;

use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use availability_cell::models::DeclareWindowRequest;
use availability_cell::services::AvailabilityLedger;
use directory_cell::models::{PartyStatus, RegisterClinicianRequest, RegisterPatientRequest};
use directory_cell::services::DirectoryService;
use scheduling_cell::models::{
    AppointmentStatus, BookSlotRequest, EncounterUpsert, ScheduleError, TransitionRequest,
};
use scheduling_cell::services::{EncounterService, ScheduleQueryService, SchedulingEngine};
use shared_database::ClinicStore;
use shared_models::auth::{Actor, Role};

struct Clinic {
    store: ClinicStore,
    clinician_id: Uuid,
    patient_id: Uuid,
}

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn time(s: &str) -> NaiveTime {
    s.parse().unwrap()
}

/// One clinician open 09:00-12:00 on 2030-06-03, one patient.
fn clinic() -> Clinic {
    let store = ClinicStore::open_in_memory().unwrap();
    let directory = DirectoryService::new(store.clone());

    let clinician = directory
        .register_clinician(&RegisterClinicianRequest {
            full_name: "Dr. Mensah".to_string(),
            email: "mensah@clinic.test".to_string(),
            specialty: "Cardiology".to_string(),
            department: Some("Medicine".to_string()),
            contact: None,
            qualification: None,
            experience_years: Some(12),
        })
        .unwrap();

    let patient = directory
        .register_patient(&RegisterPatientRequest {
            full_name: "Ama Owusu".to_string(),
            email: "ama@clinic.test".to_string(),
            age: Some(34),
            gender: None,
            contact: None,
            address: None,
            blood_group: None,
            emergency_contact: None,
        })
        .unwrap();

    let ledger = AvailabilityLedger::new(store.clone());
    ledger
        .declare_window(
            clinician.id,
            &DeclareWindowRequest {
                date: date("2030-06-03"),
                start_time: time("09:00:00"),
                end_time: time("12:00:00"),
                is_open: true,
            },
        )
        .unwrap();

    Clinic {
        store,
        clinician_id: clinician.id,
        patient_id: patient.id,
    }
}

fn patient_actor(clinic: &Clinic) -> Actor {
    Actor::new(clinic.patient_id, Role::Patient)
}

fn clinician_actor(clinic: &Clinic) -> Actor {
    Actor::new(clinic.clinician_id, Role::Clinician)
}

fn admin_actor() -> Actor {
    Actor::new(Uuid::new_v4(), Role::Admin)
}

fn booking(clinic: &Clinic, time_str: &str) -> BookSlotRequest {
    BookSlotRequest {
        patient_id: None,
        clinician_id: clinic.clinician_id,
        appointment_date: date("2030-06-03"),
        appointment_time: time(time_str),
        reason: Some("Check-up".to_string()),
    }
}

#[test]
fn booking_inside_an_open_window_succeeds() {
    let clinic = clinic();
    let engine = SchedulingEngine::new(clinic.store.clone());

    let appointment = engine
        .book_slot(&patient_actor(&clinic), &booking(&clinic, "10:00:00"))
        .unwrap();

    assert_eq!(appointment.status, AppointmentStatus::Booked);
    assert_eq!(appointment.patient_id, clinic.patient_id);
    assert_eq!(appointment.clinician_id, clinic.clinician_id);
}

#[test]
fn window_boundaries_are_bookable_but_outside_is_not() {
    let clinic = clinic();
    let engine = SchedulingEngine::new(clinic.store.clone());
    let actor = patient_actor(&clinic);

    assert!(engine.book_slot(&actor, &booking(&clinic, "09:00:00")).is_ok());
    assert!(engine.book_slot(&actor, &booking(&clinic, "12:00:00")).is_ok());

    assert_matches!(
        engine.book_slot(&actor, &booking(&clinic, "08:59:59")),
        Err(ScheduleError::Unavailable)
    );
    assert_matches!(
        engine.book_slot(&actor, &booking(&clinic, "12:00:01")),
        Err(ScheduleError::Unavailable)
    );
}

#[test]
fn past_dates_are_rejected() {
    let clinic = clinic();
    let engine = SchedulingEngine::new(clinic.store.clone());

    let mut request = booking(&clinic, "10:00:00");
    request.appointment_date = date("2020-01-01");

    assert_matches!(
        engine.book_slot(&patient_actor(&clinic), &request),
        Err(ScheduleError::PastDate(_))
    );
}

#[test]
fn a_taken_slot_conflicts_until_cancelled() {
    let clinic = clinic();
    let engine = SchedulingEngine::new(clinic.store.clone());
    let actor = patient_actor(&clinic);

    let first = engine.book_slot(&actor, &booking(&clinic, "10:00:00")).unwrap();
    assert_matches!(
        engine.book_slot(&actor, &booking(&clinic, "10:00:00")),
        Err(ScheduleError::SlotConflict)
    );

    // Cancelling frees the slot for rebooking.
    engine.cancel_slot(&actor, first.id).unwrap();
    assert!(engine.book_slot(&actor, &booking(&clinic, "10:00:00")).is_ok());
}

#[test]
fn a_completed_appointment_still_occupies_its_slot() {
    let clinic = clinic();
    let engine = SchedulingEngine::new(clinic.store.clone());
    let actor = patient_actor(&clinic);

    let appointment = engine.book_slot(&actor, &booking(&clinic, "10:00:00")).unwrap();
    engine
        .transition_with_encounter(
            &clinician_actor(&clinic),
            appointment.id,
            &TransitionRequest {
                status: AppointmentStatus::Completed,
                encounter: None,
            },
        )
        .unwrap();

    assert_matches!(
        engine.book_slot(&actor, &booking(&clinic, "10:00:00")),
        Err(ScheduleError::SlotConflict)
    );
}

#[test]
fn concurrent_bookings_of_one_slot_yield_exactly_one_appointment() {
    let clinic = clinic();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = clinic.store.clone();
        let actor = patient_actor(&clinic);
        let request = booking(&clinic, "10:00:00");
        handles.push(thread::spawn(move || {
            SchedulingEngine::new(store).book_slot(&actor, &request)
        }));
    }

    let mut won = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.join().unwrap() {
            Ok(_) => won += 1,
            Err(ScheduleError::SlotConflict) => conflicts += 1,
            Err(other) => panic!("unexpected booking error: {other}"),
        }
    }
    assert_eq!(won, 1);
    assert_eq!(conflicts, 7);
}

#[test]
fn blacklisted_parties_cannot_book() {
    let clinic = clinic();
    let directory = DirectoryService::new(clinic.store.clone());
    let engine = SchedulingEngine::new(clinic.store.clone());

    directory
        .set_patient_status(clinic.patient_id, PartyStatus::Blacklisted)
        .unwrap();
    assert_matches!(
        engine.book_slot(&patient_actor(&clinic), &booking(&clinic, "10:00:00")),
        Err(ScheduleError::Blacklisted(_))
    );

    directory
        .set_patient_status(clinic.patient_id, PartyStatus::Active)
        .unwrap();
    directory
        .set_clinician_status(clinic.clinician_id, PartyStatus::Blacklisted)
        .unwrap();
    assert_matches!(
        engine.book_slot(&patient_actor(&clinic), &booking(&clinic, "10:00:00")),
        Err(ScheduleError::Blacklisted(_))
    );
}

#[test]
fn only_a_party_to_the_appointment_can_cancel_it() {
    let clinic = clinic();
    let engine = SchedulingEngine::new(clinic.store.clone());

    let appointment = engine
        .book_slot(&patient_actor(&clinic), &booking(&clinic, "10:00:00"))
        .unwrap();

    let stranger = Actor::new(Uuid::new_v4(), Role::Patient);
    assert_matches!(
        engine.cancel_slot(&stranger, appointment.id),
        Err(ScheduleError::Forbidden(_))
    );

    // Admins can cancel anything live.
    assert!(engine.cancel_slot(&admin_actor(), appointment.id).is_ok());
}

#[test]
fn cancelling_twice_is_a_quiet_no_op() {
    let clinic = clinic();
    let engine = SchedulingEngine::new(clinic.store.clone());
    let actor = patient_actor(&clinic);

    let appointment = engine.book_slot(&actor, &booking(&clinic, "10:00:00")).unwrap();
    engine.cancel_slot(&actor, appointment.id).unwrap();

    let again = engine.cancel_slot(&actor, appointment.id).unwrap();
    assert_eq!(again.status, AppointmentStatus::Cancelled);
}

#[test]
fn completed_appointments_cannot_be_cancelled_without_override() {
    let clinic = clinic();
    let engine = SchedulingEngine::new(clinic.store.clone());

    let appointment = engine
        .book_slot(&patient_actor(&clinic), &booking(&clinic, "10:00:00"))
        .unwrap();
    engine
        .transition_with_encounter(
            &clinician_actor(&clinic),
            appointment.id,
            &TransitionRequest {
                status: AppointmentStatus::Completed,
                encounter: None,
            },
        )
        .unwrap();

    assert_matches!(
        engine.cancel_slot(&patient_actor(&clinic), appointment.id),
        Err(ScheduleError::InvalidTransition { .. })
    );

    // The admin escape hatch ignores the lifecycle table.
    let fixed = engine
        .override_status(&admin_actor(), appointment.id, AppointmentStatus::Cancelled)
        .unwrap();
    assert_eq!(fixed.status, AppointmentStatus::Cancelled);
}

#[test]
fn completion_and_encounter_commit_together() {
    let clinic = clinic();
    let engine = SchedulingEngine::new(clinic.store.clone());

    let appointment = engine
        .book_slot(&patient_actor(&clinic), &booking(&clinic, "10:00:00"))
        .unwrap();

    let (updated, record) = engine
        .transition_with_encounter(
            &clinician_actor(&clinic),
            appointment.id,
            &TransitionRequest {
                status: AppointmentStatus::Completed,
                encounter: Some(EncounterUpsert {
                    diagnosis: Some("Hypertension".to_string()),
                    prescription: Some("Amlodipine 5mg".to_string()),
                    notes: None,
                    follow_up_date: Some(date("2030-07-01")),
                }),
            },
        )
        .unwrap();

    assert_eq!(updated.status, AppointmentStatus::Completed);
    let record = record.unwrap();
    assert_eq!(record.diagnosis.as_deref(), Some("Hypertension"));

    let encounters = EncounterService::new(clinic.store.clone());
    let fetched = encounters.get_by_appointment(appointment.id).unwrap();
    assert_eq!(fetched.id, record.id);
}

#[test]
fn encounter_notes_may_accompany_any_valid_transition() {
    let clinic = clinic();
    let engine = SchedulingEngine::new(clinic.store.clone());

    let appointment = engine
        .book_slot(&patient_actor(&clinic), &booking(&clinic, "10:00:00"))
        .unwrap();

    // Partial notes written while rescheduling still land with the record.
    let (updated, record) = engine
        .transition_with_encounter(
            &clinician_actor(&clinic),
            appointment.id,
            &TransitionRequest {
                status: AppointmentStatus::Rescheduled,
                encounter: Some(EncounterUpsert {
                    diagnosis: None,
                    prescription: None,
                    notes: Some("Patient asked to move the visit".to_string()),
                    follow_up_date: None,
                }),
            },
        )
        .unwrap();

    assert_eq!(updated.status, AppointmentStatus::Rescheduled);
    assert!(record.is_some());

    let encounters = EncounterService::new(clinic.store.clone());
    let fetched = encounters.get_by_appointment(appointment.id).unwrap();
    assert_eq!(
        fetched.notes.as_deref(),
        Some("Patient asked to move the visit")
    );
}

#[test]
fn rejected_transition_writes_no_encounter() {
    let clinic = clinic();
    let engine = SchedulingEngine::new(clinic.store.clone());
    let actor = patient_actor(&clinic);

    let appointment = engine.book_slot(&actor, &booking(&clinic, "10:00:00")).unwrap();
    engine.cancel_slot(&actor, appointment.id).unwrap();

    // Cancelled is terminal, so the whole transition must fail.
    let result = engine.transition_with_encounter(
        &clinician_actor(&clinic),
        appointment.id,
        &TransitionRequest {
            status: AppointmentStatus::Completed,
            encounter: Some(EncounterUpsert {
                diagnosis: Some("Should not persist".to_string()),
                prescription: None,
                notes: None,
                follow_up_date: None,
            }),
        },
    );
    assert_matches!(result, Err(ScheduleError::InvalidTransition { .. }));

    let encounters = EncounterService::new(clinic.store.clone());
    assert_matches!(
        encounters.get_by_appointment(appointment.id),
        Err(ScheduleError::NotFound(_))
    );
}

#[test]
fn rewriting_an_encounter_replaces_it_in_place() {
    let clinic = clinic();
    let engine = SchedulingEngine::new(clinic.store.clone());
    let encounters = EncounterService::new(clinic.store.clone());

    let appointment = engine
        .book_slot(&patient_actor(&clinic), &booking(&clinic, "10:00:00"))
        .unwrap();
    let (_, first) = engine
        .transition_with_encounter(
            &clinician_actor(&clinic),
            appointment.id,
            &TransitionRequest {
                status: AppointmentStatus::Completed,
                encounter: Some(EncounterUpsert {
                    diagnosis: Some("Draft".to_string()),
                    prescription: None,
                    notes: None,
                    follow_up_date: None,
                }),
            },
        )
        .unwrap();
    let first = first.unwrap();

    let second = encounters
        .upsert(
            appointment.id,
            &EncounterUpsert {
                diagnosis: Some("Final".to_string()),
                prescription: Some("Rest".to_string()),
                notes: None,
                follow_up_date: None,
            },
        )
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.diagnosis.as_deref(), Some("Final"));
}

#[test]
fn history_pairs_appointments_with_their_encounters() {
    let clinic = clinic();
    let engine = SchedulingEngine::new(clinic.store.clone());
    let actor = patient_actor(&clinic);

    let completed = engine.book_slot(&actor, &booking(&clinic, "09:00:00")).unwrap();
    engine
        .transition_with_encounter(
            &clinician_actor(&clinic),
            completed.id,
            &TransitionRequest {
                status: AppointmentStatus::Completed,
                encounter: Some(EncounterUpsert {
                    diagnosis: Some("Migraine".to_string()),
                    prescription: None,
                    notes: None,
                    follow_up_date: None,
                }),
            },
        )
        .unwrap();
    engine.book_slot(&actor, &booking(&clinic, "11:00:00")).unwrap();

    let queries = ScheduleQueryService::new(clinic.store.clone());
    let history = queries.patient_history(clinic.patient_id).unwrap();

    assert_eq!(history.len(), 2);
    assert_eq!(history[0].appointment.id, completed.id);
    assert!(history[0].encounter.is_some());
    assert!(history[1].encounter.is_none());
}

#[test]
fn stats_track_the_lifecycle() {
    let clinic = clinic();
    let engine = SchedulingEngine::new(clinic.store.clone());
    let actor = patient_actor(&clinic);

    let first = engine.book_slot(&actor, &booking(&clinic, "09:00:00")).unwrap();
    let second = engine.book_slot(&actor, &booking(&clinic, "10:00:00")).unwrap();
    engine.book_slot(&actor, &booking(&clinic, "11:00:00")).unwrap();

    engine.cancel_slot(&actor, first.id).unwrap();
    engine
        .transition_with_encounter(
            &clinician_actor(&clinic),
            second.id,
            &TransitionRequest {
                status: AppointmentStatus::Completed,
                encounter: None,
            },
        )
        .unwrap();

    let stats = ScheduleQueryService::new(clinic.store.clone())
        .stats()
        .unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.booked, 1);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.cancelled, 1);
    assert_eq!(stats.rescheduled, 0);
}
