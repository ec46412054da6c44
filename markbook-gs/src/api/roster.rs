//! Course roster API handlers
//!
//! Thin proxy over the course directory. Lookups never fail the request;
//! an unreachable directory produces the built-in demo courses so the
//! service stays usable offline.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::{
    models::{Course, Student},
    seed, AppState,
};

/// GET /roster/courses query parameters
#[derive(Debug, Deserialize)]
pub struct CoursesQuery {
    /// Teacher email forwarded to the directory
    #[serde(default)]
    pub teacher: String,
}

/// GET /roster/courses/:course_code/students query parameters
#[derive(Debug, Deserialize)]
pub struct StudentsQuery {
    #[serde(default)]
    pub teacher: String,
    /// Bypass the per-course cache
    #[serde(default)]
    pub refresh: bool,
}

/// GET /roster/courses
///
/// Courses for a teacher. Falls back to the demo courses when the
/// directory yields nothing.
pub async fn list_courses(
    State(state): State<AppState>,
    Query(query): Query<CoursesQuery>,
) -> Json<Vec<Course>> {
    let courses = state.roster.fetch_courses(&query.teacher).await;
    if courses.is_empty() {
        tracing::info!(
            teacher = %query.teacher,
            "Directory returned no courses, serving demo courses"
        );
        return Json(seed::demo_courses());
    }
    Json(courses)
}

/// GET /roster/courses/:course_code/students
///
/// Students of one course, cached per course after the first lookup.
/// `?refresh=true` bypasses the cache. An empty directory result is
/// cached too, matching the one-fetch-per-course contract.
pub async fn list_students(
    State(state): State<AppState>,
    Path(course_code): Path<String>,
    Query(query): Query<StudentsQuery>,
) -> Json<Vec<Student>> {
    if !query.refresh {
        if let Some(cached) = state.students_cache.read().await.get(&course_code) {
            tracing::debug!(course_code = %course_code, "Serving cached student roster");
            return Json(cached.clone());
        }
    }

    let students = state
        .roster
        .fetch_students(&course_code, &query.teacher)
        .await;

    tracing::info!(
        course_code = %course_code,
        count = students.len(),
        "Student roster fetched from directory"
    );

    state
        .students_cache
        .write()
        .await
        .insert(course_code, students.clone());

    Json(students)
}

/// Build roster routes
pub fn roster_routes() -> Router<AppState> {
    Router::new()
        .route("/roster/courses", get(list_courses))
        .route("/roster/courses/:course_code/students", get(list_students))
}
