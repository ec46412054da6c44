//! Service layer: external clients and domain logic

pub mod grading_client;
pub mod key_extractor;
pub mod key_matcher;
pub mod roster_client;

pub use grading_client::{GradingClient, GradingError, IdentificationOutcome, UNKNOWN_CODE};
pub use key_extractor::{BatchState, ExtractionBatch, KeyExtractor, KeyUploadFile};
pub use roster_client::RosterClient;
