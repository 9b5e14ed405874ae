use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use shared_models::auth::{Actor, Role};
use shared_models::error::AppError;

/// Header carrying the authenticated caller's id, set by the gateway.
pub const ACTOR_ID_HEADER: &str = "x-actor-id";
/// Header carrying the authenticated caller's role, set by the gateway.
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Middleware materializing the caller identity forwarded by the
/// authentication gateway. Authentication itself happens upstream; requests
/// reaching this service without identity headers are rejected outright.
/// The scheduling engine still re-checks ownership per operation.
pub async fn actor_middleware(
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let actor = actor_from_request(&request).inspect_err(|e| {
        warn!("Rejected request without usable identity headers: {}", e);
    })?;
    debug!(actor_id = %actor.id, role = %actor.role, "Actor resolved");
    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

fn actor_from_request(request: &Request<Body>) -> Result<Actor, AppError> {
    let id = request
        .headers()
        .get(ACTOR_ID_HEADER)
        .ok_or_else(|| AppError::Auth(format!("Missing {} header", ACTOR_ID_HEADER)))?
        .to_str()
        .map_err(|_| AppError::Auth(format!("Invalid {} header", ACTOR_ID_HEADER)))?
        .parse::<uuid::Uuid>()
        .map_err(|_| AppError::Auth(format!("Invalid {} header", ACTOR_ID_HEADER)))?;

    let role = request
        .headers()
        .get(ACTOR_ROLE_HEADER)
        .ok_or_else(|| AppError::Auth(format!("Missing {} header", ACTOR_ROLE_HEADER)))?
        .to_str()
        .map_err(|_| AppError::Auth(format!("Invalid {} header", ACTOR_ROLE_HEADER)))?
        .parse::<Role>()
        .map_err(|_| AppError::Auth(format!("Invalid {} header", ACTOR_ROLE_HEADER)))?;

    Ok(Actor::new(id, role))
}
