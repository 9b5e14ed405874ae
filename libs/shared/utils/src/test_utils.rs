//! Helpers shared by cell integration tests.

use uuid::Uuid;

use shared_models::auth::{Actor, Role};

use crate::extractor::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};

/// Ready-made actors for tests.
pub struct TestActors;

impl TestActors {
    pub fn admin() -> Actor {
        Actor::new(Uuid::new_v4(), Role::Admin)
    }

    pub fn clinician(id: Uuid) -> Actor {
        Actor::new(id, Role::Clinician)
    }

    pub fn patient(id: Uuid) -> Actor {
        Actor::new(id, Role::Patient)
    }
}

/// Header pairs for driving routers through `tower::ServiceExt::oneshot`.
pub fn actor_headers(actor: &Actor) -> [(&'static str, String); 2] {
    [
        (ACTOR_ID_HEADER, actor.id.to_string()),
        (ACTOR_ROLE_HEADER, actor.role.to_string()),
    ]
}
