//! HTTP API handlers for markbook-gs

pub mod answer_keys;
pub mod grading;
pub mod health;
pub mod roster;
pub mod sessions;
pub mod sse;

pub use answer_keys::answer_key_routes;
pub use grading::grading_routes;
pub use health::health_routes;
pub use roster::roster_routes;
pub use sessions::session_routes;
pub use sse::grading_event_stream;
