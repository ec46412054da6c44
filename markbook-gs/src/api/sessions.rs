//! Graded session ledger API handlers

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::{models::ExamSession, AppState};

/// GET /grading/sessions query parameters
#[derive(Debug, Deserialize)]
pub struct SessionsQuery {
    /// Restrict to one student's sessions
    pub student_id: Option<String>,
}

/// GET /grading/sessions
///
/// All graded sessions, newest first. With `?student_id=X`, only that
/// student's sessions.
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<SessionsQuery>,
) -> Json<Vec<ExamSession>> {
    let sessions = match query.student_id {
        Some(student_id) => state.ledger.for_student(&student_id).await,
        None => state.ledger.list().await,
    };
    Json(sessions)
}

/// Build session ledger routes
pub fn session_routes() -> Router<AppState> {
    Router::new().route("/grading/sessions", get(list_sessions))
}
