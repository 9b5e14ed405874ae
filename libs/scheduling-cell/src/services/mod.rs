pub mod booking;
pub mod encounter;
pub mod lifecycle;
pub mod queries;

pub use booking::SchedulingEngine;
pub use encounter::EncounterService;
pub use queries::ScheduleQueryService;
