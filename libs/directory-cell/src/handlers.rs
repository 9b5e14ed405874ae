use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::AppState;
use shared_models::auth::{Actor, Role};
use shared_models::error::AppError;

use crate::models::{
    RegisterClinicianRequest, RegisterPatientRequest, SetStatusRequest, UpdateClinicianRequest,
    UpdatePatientRequest,
};
use crate::services::DirectoryService;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

fn ensure_admin(actor: &Actor) -> Result<(), AppError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Admin access required".to_string()))
    }
}

/// Registration and status changes come from the front desk; profile edits
/// may also come from the party themselves.
fn ensure_admin_or_self(actor: &Actor, subject: Uuid) -> Result<(), AppError> {
    if actor.is_admin() || actor.id == subject {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the owner or an admin can edit this profile".to_string(),
        ))
    }
}

#[axum::debug_handler]
pub async fn register_clinician(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<RegisterClinicianRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_admin(&actor)?;
    let service = DirectoryService::new(state.store.clone());
    let clinician = service.register_clinician(&request)?;
    Ok(Json(json!(clinician)))
}

#[axum::debug_handler]
pub async fn register_patient(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<RegisterPatientRequest>,
) -> Result<Json<Value>, AppError> {
    if actor.role == Role::Clinician {
        return Err(AppError::Forbidden(
            "Clinicians cannot register patients".to_string(),
        ));
    }
    let service = DirectoryService::new(state.store.clone());
    let patient = service.register_patient(&request)?;
    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn get_clinician(
    State(state): State<Arc<AppState>>,
    Path(clinician_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = DirectoryService::new(state.store.clone());
    let clinician = service.get_clinician(clinician_id)?;
    Ok(Json(json!(clinician)))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<Arc<AppState>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = DirectoryService::new(state.store.clone());
    let patient = service.get_patient(patient_id)?;
    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn list_clinicians(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Value>, AppError> {
    let service = DirectoryService::new(state.store.clone());
    let clinicians = service.list_clinicians(query.search.as_deref())?;
    Ok(Json(json!({
        "clinicians": clinicians,
        "total": clinicians.len()
    })))
}

#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Value>, AppError> {
    if actor.role == Role::Patient {
        return Err(AppError::Forbidden(
            "Patients cannot browse the patient directory".to_string(),
        ));
    }
    let service = DirectoryService::new(state.store.clone());
    let patients = service.list_patients(query.search.as_deref())?;
    Ok(Json(json!({
        "patients": patients,
        "total": patients.len()
    })))
}

#[axum::debug_handler]
pub async fn update_clinician(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(clinician_id): Path<Uuid>,
    Json(request): Json<UpdateClinicianRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_admin_or_self(&actor, clinician_id)?;
    let service = DirectoryService::new(state.store.clone());
    let clinician = service.update_clinician(clinician_id, &request)?;
    Ok(Json(json!(clinician)))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_admin_or_self(&actor, patient_id)?;
    let service = DirectoryService::new(state.store.clone());
    let patient = service.update_patient(patient_id, &request)?;
    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn set_clinician_status(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(clinician_id): Path<Uuid>,
    Json(request): Json<SetStatusRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_admin(&actor)?;
    let service = DirectoryService::new(state.store.clone());
    let clinician = service.set_clinician_status(clinician_id, request.status)?;
    Ok(Json(json!(clinician)))
}

#[axum::debug_handler]
pub async fn set_patient_status(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<SetStatusRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_admin(&actor)?;
    let service = DirectoryService::new(state.store.clone());
    let patient = service.set_patient_status(patient_id, request.status)?;
    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn directory_stats(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    ensure_admin(&actor)?;
    let service = DirectoryService::new(state.store.clone());
    let stats = service.stats()?;
    Ok(Json(json!(stats)))
}
