use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::AppState;
use shared_models::auth::{Actor, Role};
use shared_models::error::AppError;

use crate::models::{
    AppointmentSearchFilters, BookSlotRequest, OverrideStatusRequest, TransitionRequest,
};
use crate::services::{EncounterService, ScheduleQueryService, SchedulingEngine};

#[axum::debug_handler]
pub async fn book_slot(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<BookSlotRequest>,
) -> Result<Json<Value>, AppError> {
    let engine = SchedulingEngine::new(state.store.clone());
    let appointment = engine.book_slot(&actor, &request)?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let engine = SchedulingEngine::new(state.store.clone());
    let appointment = engine.get_appointment(&actor, appointment_id)?;
    Ok(Json(json!(appointment)))
}

/// Search is scoped to the caller: patients and clinicians only ever see
/// their own appointments regardless of the filters they pass.
#[axum::debug_handler]
pub async fn search_appointments(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Query(mut filters): Query<AppointmentSearchFilters>,
) -> Result<Json<Value>, AppError> {
    match actor.role {
        Role::Admin => {}
        Role::Patient => filters.patient_id = Some(actor.id),
        Role::Clinician => filters.clinician_id = Some(actor.id),
    }

    let queries = ScheduleQueryService::new(state.store.clone());
    let appointments = queries.search(&filters)?;
    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn cancel_slot(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let engine = SchedulingEngine::new(state.store.clone());
    let appointment = engine.cancel_slot(&actor, appointment_id)?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn transition_appointment(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<TransitionRequest>,
) -> Result<Json<Value>, AppError> {
    let engine = SchedulingEngine::new(state.store.clone());
    let (appointment, encounter) =
        engine.transition_with_encounter(&actor, appointment_id, &request)?;
    Ok(Json(json!({
        "appointment": appointment,
        "encounter": encounter
    })))
}

#[axum::debug_handler]
pub async fn override_status(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<OverrideStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let engine = SchedulingEngine::new(state.store.clone());
    let appointment = engine.override_status(&actor, appointment_id, request.status)?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn get_encounter(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    // Visibility follows the appointment itself.
    let engine = SchedulingEngine::new(state.store.clone());
    engine.get_appointment(&actor, appointment_id)?;

    let encounters = EncounterService::new(state.store.clone());
    let record = encounters.get_by_appointment(appointment_id)?;
    Ok(Json(json!(record)))
}

#[axum::debug_handler]
pub async fn patient_history(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    if actor.role == Role::Patient && actor.id != patient_id {
        return Err(AppError::Forbidden(
            "Patients can only view their own history".to_string(),
        ));
    }

    let queries = ScheduleQueryService::new(state.store.clone());
    let history = queries.patient_history(patient_id)?;
    Ok(Json(json!({
        "history": history,
        "total": history.len()
    })))
}

#[axum::debug_handler]
pub async fn schedule_stats(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    if !actor.is_admin() {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }
    let queries = ScheduleQueryService::new(state.store.clone());
    let stats = queries.stats()?;
    Ok(Json(json!(stats)))
}
