use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use availability_cell::router::availability_routes;
use directory_cell::router::directory_routes;
use scheduling_cell::router::scheduling_routes;
use shared_database::AppState;

pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/directory", directory_routes(state.clone()))
        .nest("/availability", availability_routes(state.clone()))
        .nest("/appointments", scheduling_routes(state))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "clinic-api"
    }))
}
