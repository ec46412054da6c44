//! Structured grading output
//!
//! The grading model is asked for JSON matching a fixed response schema.
//! Models still wrap payloads in Markdown code fences often enough that
//! parsing strips them first.

use serde::{Deserialize, Serialize};

/// Verdict for a single exam question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrectionStatus {
    Correct,
    Incorrect,
}

/// Per-question annotation from the grading model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Correction {
    /// Question label as printed on the paper, e.g. "Q3" or "Part 2, 5"
    pub question: String,
    pub status: CorrectionStatus,
    /// What the student wrote, or the expected answer when incorrect
    pub text: String,
}

/// Skill-level scores on a 0-100 scale
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SkillBreakdown {
    pub listening: f64,
    pub reading: f64,
    pub writing: f64,
    pub speaking: f64,
}

/// Complete grading result for one exam paper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeReport {
    /// Overall score on a 0-100 scale
    pub score: f64,

    /// Narrative feedback addressed to the student
    pub feedback: String,

    pub skills: SkillBreakdown,

    /// Question-by-question annotations; empty when the model omits them
    #[serde(default)]
    pub corrections: Vec<Correction>,
}

impl GradeReport {
    /// Parse a report from raw model text, stripping code fences first.
    ///
    /// Missing required fields are a parse error; the caller surfaces
    /// those as a retryable model failure.
    pub fn from_model_text(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(clean_json_response(raw))
    }
}

/// Strip a Markdown code fence wrapper from model output.
///
/// Handles ```` ```json ```` and bare ```` ``` ```` prefixes plus a
/// trailing fence, in that order. Fence markers inside the payload are
/// left alone. Already-clean JSON passes through unchanged.
pub fn clean_json_response(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        text = stripped;
    } else if let Some(stripped) = text.strip_prefix("```") {
        text = stripped;
    }
    if let Some(stripped) = text.strip_suffix("```") {
        text = stripped;
    }
    text.trim()
}
