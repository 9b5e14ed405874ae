use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::actor_middleware;

use crate::handlers;

pub fn scheduling_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/",
            post(handlers::book_slot).get(handlers::search_appointments),
        )
        .route("/stats", get(handlers::schedule_stats))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_slot))
        .route(
            "/{appointment_id}/transition",
            post(handlers::transition_appointment),
        )
        .route("/{appointment_id}/status", patch(handlers::override_status))
        .route("/{appointment_id}/encounter", get(handlers::get_encounter))
        .route(
            "/patients/{patient_id}/history",
            get(handlers::patient_history),
        )
        .layer(middleware::from_fn(actor_middleware))
        .with_state(state)
}
