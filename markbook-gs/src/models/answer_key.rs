//! Answer key registry records
//!
//! An answer key pairs an exam-variant code with the reference content used
//! as grading ground truth. Keys usually enter the registry through the
//! batch extraction pipeline; extraction failures are recorded as `FAILED`
//! keys with an empty content body so review and re-upload stay possible.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Extraction outcome for a registry entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KeyStatus {
    /// Content extracted and usable as grading ground truth
    Ready,
    /// Extraction failed; `failure_reason` carries the diagnostic
    Failed,
}

/// One answer key in the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerKey {
    pub id: Uuid,

    /// Display label, normally the upload filename minus its extension
    pub name: String,

    /// Exam-variant code used for matching, e.g. "SKE1"
    ///
    /// Compared case- and whitespace-insensitively at match time. May be
    /// empty for hand-created keys; empty codes never match.
    pub code: String,

    /// Reference answer content; empty when `status` is `FAILED`
    pub content: String,

    pub status: KeyStatus,

    /// Diagnostic set when extraction failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    /// Original upload payload kept for preview, when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_data: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl AnswerKey {
    /// Create a ready key from explicit fields (manual entry path).
    pub fn new(name: String, code: String, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            code,
            content,
            status: KeyStatus::Ready,
            failure_reason: None,
            file_data: None,
            mime_type: None,
            created_at: Utc::now(),
        }
    }

    /// Create a ready key from a successful extraction.
    pub fn from_extraction(
        file_name: &str,
        content: String,
        file_data: String,
        mime_type: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: display_name_from_filename(file_name),
            code: code_from_filename(file_name),
            content,
            status: KeyStatus::Ready,
            failure_reason: None,
            file_data: Some(file_data),
            mime_type: Some(mime_type),
            created_at: Utc::now(),
        }
    }

    /// Create a failed key recording why extraction did not produce content.
    pub fn from_failed_extraction(file_name: &str, reason: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: display_name_from_filename(file_name),
            code: code_from_filename(file_name),
            content: String::new(),
            status: KeyStatus::Failed,
            failure_reason: Some(reason),
            file_data: None,
            mime_type: None,
            created_at: Utc::now(),
        }
    }

    /// Whether this key's content can be used as grading ground truth.
    pub fn is_ready(&self) -> bool {
        self.status == KeyStatus::Ready
    }
}

/// Derive a key's display name from its upload filename.
///
/// Strips one trailing extension (final dot plus non-dot characters).
/// Names without an extension pass through unchanged.
pub fn display_name_from_filename(file_name: &str) -> String {
    match file_name.rfind('.') {
        Some(idx)
            if idx + 1 < file_name.len()
                && !file_name[idx + 1..].contains('/') =>
        {
            file_name[..idx].to_string()
        }
        _ => file_name.to_string(),
    }
}

/// Derive a key's exam code from its upload filename.
///
/// Takes the segment before the first underscore. Filenames with a leading
/// underscore (empty segment) fall back to "TBD" for manual correction.
pub fn code_from_filename(file_name: &str) -> String {
    let segment = file_name.split('_').next().unwrap_or("");
    if segment.is_empty() {
        "TBD".to_string()
    } else {
        segment.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_strips_one_extension() {
        assert_eq!(display_name_from_filename("SKE1_Starters.pdf"), "SKE1_Starters");
        assert_eq!(display_name_from_filename("archive.tar.gz"), "archive.tar");
        assert_eq!(display_name_from_filename("no_extension"), "no_extension");
    }

    #[test]
    fn display_name_keeps_trailing_dot() {
        assert_eq!(display_name_from_filename("odd."), "odd.");
    }

    #[test]
    fn code_is_segment_before_first_underscore() {
        assert_eq!(code_from_filename("SKE1_Starters_RW.pdf"), "SKE1");
        assert_eq!(code_from_filename("YC3_KET Reading.png"), "YC3");
    }

    #[test]
    fn code_without_underscore_is_whole_name() {
        assert_eq!(code_from_filename("SKE1.pdf"), "SKE1.pdf");
    }

    #[test]
    fn leading_underscore_falls_back_to_tbd() {
        assert_eq!(code_from_filename("_draft.pdf"), "TBD");
    }

    #[test]
    fn failed_extraction_has_empty_content() {
        let key = AnswerKey::from_failed_extraction("SKG1_Movers.pdf", "model unreachable".to_string());
        assert_eq!(key.status, KeyStatus::Failed);
        assert!(key.content.is_empty());
        assert_eq!(key.failure_reason.as_deref(), Some("model unreachable"));
        assert_eq!(key.code, "SKG1");
        assert!(!key.is_ready());
    }

    #[test]
    fn key_status_serializes_uppercase() {
        let key = AnswerKey::new("Sample".to_string(), "SKE1".to_string(), "1. A".to_string());
        let json = serde_json::to_value(&key).unwrap();
        assert_eq!(json["status"], "READY");
        assert!(json.get("failure_reason").is_none());
    }
}
