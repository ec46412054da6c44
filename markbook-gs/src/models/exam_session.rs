//! Graded exam session records
//!
//! A session is the permanent record of one graded paper. Sessions are
//! written exactly once, as the terminal step of a successful grading
//! attempt, and never mutated afterwards.

use crate::models::{Correction, GradeReport, SkillBreakdown};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of an exam session
///
/// Only `GRADED` sessions reach the ledger; the other states exist for
/// API compatibility with clients that render in-flight work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    NotGraded,
    Processing,
    Graded,
}

/// Permanent record of one graded exam paper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamSession {
    pub id: Uuid,

    /// Student identity at grading time, denormalized from the roster
    pub student_id: String,
    pub student_name: String,
    pub course_id: String,

    /// Completion timestamp
    pub date: DateTime<Utc>,

    pub status: SessionStatus,

    /// Overall score on a 0-100 scale
    pub score: f64,

    pub feedback: String,

    pub skills: SkillBreakdown,

    #[serde(default)]
    pub corrections: Vec<Correction>,
}

impl ExamSession {
    /// Build the permanent session record from a grading result.
    ///
    /// Score, feedback, skills and corrections carry over verbatim.
    pub fn from_report(
        student_id: String,
        student_name: String,
        course_id: String,
        report: GradeReport,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id,
            student_name,
            course_id,
            date: Utc::now(),
            status: SessionStatus::Graded,
            score: report.score,
            feedback: report.feedback,
            skills: report.skills,
            corrections: report.corrections,
        }
    }
}
