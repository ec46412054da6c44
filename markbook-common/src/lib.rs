//! # Markbook Common Library
//!
//! Shared code for Markbook services including:
//! - Event types (MarkbookEvent enum) and the EventBus
//! - Configuration file resolution
//! - Common error types

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
