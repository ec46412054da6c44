//! Institutional roster directory client
//!
//! Pulls courses and enrolments from the ORDS-style directory. Pages are
//! followed via the `next` link while `hasMore` is set; `http://` next
//! links are rewritten to `https://` because the directory emits plain
//! links behind its proxy.
//!
//! Directory access is best-effort by contract: any transport, status or
//! decode problem ends pagination and yields whatever was accumulated.
//! Callers fall back to seeded demo data when the result is empty.

use crate::models::{Course, Student};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

const USER_AGENT: &str = "Markbook/0.1.0 (grading service)";

/// One page of an ORDS collection response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrdsPage {
    #[serde(default)]
    items: Vec<serde_json::Value>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    links: Vec<OrdsLink>,
}

#[derive(Debug, Clone, Deserialize)]
struct OrdsLink {
    rel: String,
    href: String,
}

/// Roster directory client
pub struct RosterClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl RosterClient {
    pub fn new(base_url: &str, request_timeout_secs: u64) -> markbook_common::Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(request_timeout_secs))
            .build()
            .map_err(|e| {
                markbook_common::Error::Internal(format!("HTTP client build failed: {}", e))
            })?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the courses assigned to a teacher.
    ///
    /// Returns an empty list when the directory is unreachable or has
    /// nothing for this teacher; the caller decides about fallbacks.
    pub async fn fetch_courses(&self, teacher_email: &str) -> Vec<Course> {
        let url = format!("{}/MyCourses", self.base_url);
        let items = self
            .fetch_all(url, vec![("APP_USER", teacher_email.to_string())])
            .await;

        debug!(count = items.len(), "Fetched course items from directory");
        items.iter().map(course_from_item).collect()
    }

    /// Fetch the students enrolled in one course.
    pub async fn fetch_students(&self, course_code: &str, teacher_email: &str) -> Vec<Student> {
        let mut url = match reqwest::Url::parse(&format!("{}/StudentCourses", self.base_url)) {
            Ok(url) => url,
            Err(e) => {
                warn!("Invalid roster base URL: {}", e);
                return Vec::new();
            }
        };
        url.query_pairs_mut().append_pair("p_course_code", course_code);

        let items = self
            .fetch_all(
                url.to_string(),
                vec![
                    ("COURSE_CODE", course_code.to_string()),
                    ("APP_USER", teacher_email.to_string()),
                ],
            )
            .await;

        debug!(
            course_code = course_code,
            count = items.len(),
            "Fetched student items from directory"
        );
        items.iter().filter_map(student_from_item).collect()
    }

    /// Accumulate all pages of an ORDS collection.
    async fn fetch_all(
        &self,
        initial_url: String,
        headers: Vec<(&'static str, String)>,
    ) -> Vec<serde_json::Value> {
        let mut items = Vec::new();
        let mut next_url = Some(initial_url);

        while let Some(url) = next_url.take() {
            let mut request = self
                .http_client
                .get(&url)
                .header("Content-Type", "application/json");
            for (name, value) in &headers {
                request = request.header(*name, value);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    warn!("Directory request failed: {}", e);
                    break;
                }
            };

            if !response.status().is_success() {
                warn!(
                    status = response.status().as_u16(),
                    "Directory returned non-success status"
                );
                break;
            }

            let page: OrdsPage = match response.json().await {
                Ok(page) => page,
                Err(e) => {
                    warn!("Directory page decode failed: {}", e);
                    break;
                }
            };

            items.extend(page.items);

            next_url = if page.has_more {
                page.links
                    .iter()
                    .find(|link| link.rel == "next")
                    .map(|link| link.href.replace("http://", "https://"))
            } else {
                None
            };
        }

        items
    }
}

/// Map one directory course item, filling gaps with display fallbacks.
fn course_from_item(item: &serde_json::Value) -> Course {
    let course_code = non_empty_str(item, "course_code");

    Course {
        id: course_code
            .clone()
            .or_else(|| item.get("course_id").map(scalar_to_string))
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        name: course_code
            .or_else(|| non_empty_str(item, "course_name"))
            .unwrap_or_else(|| "Course".to_string()),
        code: non_empty_str(item, "code").unwrap_or_else(|| "ENG".to_string()),
        schedule: non_empty_str(item, "from_to_date").unwrap_or_else(|| "N/A".to_string()),
        room: non_empty_str(item, "classroom").unwrap_or_else(|| "TBD".to_string()),
        student_count: item
            .get("count_students")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32,
        campus: non_empty_str(item, "campuse_code").unwrap_or_else(|| "Campus".to_string()),
    }
}

/// Map one directory enrolment item; items without a student code are
/// unusable and skipped.
fn student_from_item(item: &serde_json::Value) -> Option<Student> {
    let id = non_empty_str(item, "student_code")?;
    let name = non_empty_str(item, "full_name").unwrap_or_default();
    let avatar_initials = Student::initials_from_name(&name);

    Some(Student {
        id,
        name,
        avatar_initials,
    })
}

fn non_empty_str(item: &serde_json::Value, key: &str) -> Option<String> {
    item.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

fn scalar_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn course_mapping_prefers_course_code() {
        let item = json!({
            "course_code": "SKE 3A",
            "course_id": 9912,
            "course_name": "SuperKids 3A",
            "code": "SKE",
            "from_to_date": "Mon-Wed 17:30",
            "classroom": "R204",
            "count_students": 18,
            "campuse_code": "NCT"
        });

        let course = course_from_item(&item);
        assert_eq!(course.id, "SKE 3A");
        assert_eq!(course.name, "SKE 3A");
        assert_eq!(course.code, "SKE");
        assert_eq!(course.schedule, "Mon-Wed 17:30");
        assert_eq!(course.room, "R204");
        assert_eq!(course.student_count, 18);
        assert_eq!(course.campus, "NCT");
    }

    #[test]
    fn course_mapping_falls_back_to_course_id_and_defaults() {
        let item = json!({ "course_id": 4451, "course_name": "Young Leaders 6" });

        let course = course_from_item(&item);
        assert_eq!(course.id, "4451");
        assert_eq!(course.name, "Young Leaders 6");
        assert_eq!(course.code, "ENG");
        assert_eq!(course.schedule, "N/A");
        assert_eq!(course.room, "TBD");
        assert_eq!(course.student_count, 0);
        assert_eq!(course.campus, "Campus");
    }

    #[test]
    fn course_mapping_generates_id_when_all_identifiers_missing() {
        let course = course_from_item(&json!({}));
        assert!(!course.id.is_empty());
        assert_eq!(course.name, "Course");
    }

    #[test]
    fn student_mapping_derives_initials() {
        let item = json!({ "student_code": "st-882", "full_name": "Nguyen Hoang Minh" });

        let student = student_from_item(&item).expect("student");
        assert_eq!(student.id, "st-882");
        assert_eq!(student.name, "Nguyen Hoang Minh");
        assert_eq!(student.avatar_initials, "M");
    }

    #[test]
    fn student_without_code_is_skipped() {
        assert!(student_from_item(&json!({ "full_name": "No Code" })).is_none());
    }

    #[test]
    fn ords_page_decodes_camel_case() {
        let page: OrdsPage = serde_json::from_value(json!({
            "items": [{"a": 1}],
            "hasMore": true,
            "links": [{"rel": "next", "href": "http://dir.example/next"}]
        }))
        .unwrap();

        assert_eq!(page.items.len(), 1);
        assert!(page.has_more);
        assert_eq!(page.links[0].rel, "next");
    }
}
