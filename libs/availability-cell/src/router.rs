use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::actor_middleware;

use crate::handlers;

pub fn availability_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/clinicians/{clinician_id}/windows",
            post(handlers::declare_window).get(handlers::list_windows),
        )
        .route(
            "/clinicians/{clinician_id}/windows/batch",
            post(handlers::declare_windows),
        )
        .route(
            "/clinicians/{clinician_id}/schedule",
            get(handlers::week_schedule),
        )
        .route("/clinicians/{clinician_id}/open", get(handlers::is_open_at))
        .layer(middleware::from_fn(actor_middleware))
        .with_state(state)
}
