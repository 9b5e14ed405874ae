use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::actor_middleware;

use crate::handlers;

pub fn directory_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/clinicians",
            post(handlers::register_clinician).get(handlers::list_clinicians),
        )
        .route(
            "/clinicians/{clinician_id}",
            get(handlers::get_clinician).put(handlers::update_clinician),
        )
        .route(
            "/clinicians/{clinician_id}/status",
            patch(handlers::set_clinician_status),
        )
        .route(
            "/patients",
            post(handlers::register_patient).get(handlers::list_patients),
        )
        .route(
            "/patients/{patient_id}",
            get(handlers::get_patient).put(handlers::update_patient),
        )
        .route(
            "/patients/{patient_id}/status",
            patch(handlers::set_patient_status),
        )
        .route("/stats", get(handlers::directory_stats))
        .layer(middleware::from_fn(actor_middleware))
        .with_state(state)
}
