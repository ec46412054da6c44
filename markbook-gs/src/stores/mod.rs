//! Owned in-memory stores
//!
//! Each store exclusively owns one record family. Handlers and the
//! pipeline share them behind `Arc` via `AppState`.

pub mod answer_key_store;
pub mod attempt_registry;
pub mod session_ledger;

pub use answer_key_store::AnswerKeyStore;
pub use attempt_registry::AttemptRegistry;
pub use session_ledger::SessionLedger;
