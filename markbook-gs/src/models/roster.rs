//! Roster domain types
//!
//! Local mirrors of the institutional course directory. These are cached
//! snapshots keyed by course, refreshed on demand, and never authoritative.

use serde::{Deserialize, Serialize};

/// A course as shown to graders
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub name: String,
    /// Course-family code, e.g. "SKE" or "YL"
    pub code: String,
    pub schedule: String,
    pub room: String,
    pub student_count: u32,
    pub campus: String,
}

/// An enrolled student within a course
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub name: String,
    /// Single letter used for avatar placeholders
    pub avatar_initials: String,
}

impl Student {
    /// Derive the avatar letter from a full name.
    ///
    /// Vietnamese name order puts the given name last, so the initial
    /// comes from the final word. Falls back to "S" for empty names.
    pub fn initials_from_name(full_name: &str) -> String {
        full_name
            .split_whitespace()
            .last()
            .and_then(|word| word.chars().next())
            .map(|c| c.to_string())
            .unwrap_or_else(|| "S".to_string())
    }
}
