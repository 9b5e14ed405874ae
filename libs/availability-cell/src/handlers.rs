use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::AppState;
use shared_models::auth::{Actor, Role};
use shared_models::error::AppError;

use crate::models::{DeclareWindowRequest, DeclareWindowsRequest};
use crate::services::AvailabilityLedger;

#[derive(Debug, Deserialize)]
pub struct WindowListQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct WeekQuery {
    pub from: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct OpenQuery {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

/// Only the clinician themselves or an admin may touch a clinician's ledger.
fn ensure_can_manage(actor: &Actor, clinician_id: Uuid) -> Result<(), AppError> {
    match actor.role {
        Role::Admin => Ok(()),
        Role::Clinician if actor.id == clinician_id => Ok(()),
        _ => Err(AppError::Forbidden(
            "Only the clinician or an admin can manage availability".to_string(),
        )),
    }
}

#[axum::debug_handler]
pub async fn declare_window(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(clinician_id): Path<Uuid>,
    Json(request): Json<DeclareWindowRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_can_manage(&actor, clinician_id)?;

    let ledger = AvailabilityLedger::new(state.store.clone());
    let window = ledger.declare_window(clinician_id, &request)?;
    Ok(Json(json!(window)))
}

#[axum::debug_handler]
pub async fn declare_windows(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(clinician_id): Path<Uuid>,
    Json(request): Json<DeclareWindowsRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_can_manage(&actor, clinician_id)?;

    let ledger = AvailabilityLedger::new(state.store.clone());
    let windows = ledger.declare_windows(clinician_id, &request.windows)?;
    Ok(Json(json!({
        "windows": windows,
        "total": windows.len()
    })))
}

#[axum::debug_handler]
pub async fn list_windows(
    State(state): State<Arc<AppState>>,
    Path(clinician_id): Path<Uuid>,
    Query(query): Query<WindowListQuery>,
) -> Result<Json<Value>, AppError> {
    let ledger = AvailabilityLedger::new(state.store.clone());
    let windows = ledger.list_windows(clinician_id, query.date)?;
    Ok(Json(json!({
        "windows": windows,
        "total": windows.len()
    })))
}

#[axum::debug_handler]
pub async fn week_schedule(
    State(state): State<Arc<AppState>>,
    Path(clinician_id): Path<Uuid>,
    Query(query): Query<WeekQuery>,
) -> Result<Json<Value>, AppError> {
    let ledger = AvailabilityLedger::new(state.store.clone());
    let schedule = ledger.week_schedule(clinician_id, query.from)?;
    Ok(Json(json!({ "schedule": schedule })))
}

#[axum::debug_handler]
pub async fn is_open_at(
    State(state): State<Arc<AppState>>,
    Path(clinician_id): Path<Uuid>,
    Query(query): Query<OpenQuery>,
) -> Result<Json<Value>, AppError> {
    let ledger = AvailabilityLedger::new(state.store.clone());
    let open = ledger.is_open_at(clinician_id, query.date, query.time)?;
    Ok(Json(json!({
        "clinician_id": clinician_id,
        "date": query.date,
        "time": query.time,
        "open": open
    })))
}
