//! Data models for markbook-gs (Grading Service)

pub mod answer_key;
pub mod document;
pub mod exam_session;
pub mod grade_report;
pub mod grading_attempt;
pub mod roster;

pub use answer_key::{AnswerKey, KeyStatus};
pub use document::{ExamDocument, IntakeError};
pub use exam_session::{ExamSession, SessionStatus};
pub use grade_report::{clean_json_response, Correction, CorrectionStatus, GradeReport, SkillBreakdown};
pub use grading_attempt::{AttemptProgress, AttemptState, GradingAttempt, StateTransition};
pub use roster::{Course, Student};
