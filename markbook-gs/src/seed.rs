//! Built-in demo data
//!
//! Loaded at startup when `seed_demo_data` is enabled and served as the
//! roster fallback when the course directory is unreachable, so the
//! service can be exercised end to end without directory credentials.

use crate::models::{AnswerKey, Course, Student};
use crate::AppState;

/// Course whose roster is pre-cached at startup
pub const DEMO_ROSTER_COURSE_ID: &str = "c2";

/// Demo course catalogue
pub fn demo_courses() -> Vec<Course> {
    vec![
        Course {
            id: "c1".to_string(),
            name: "SuperKids SKE 3A".to_string(),
            code: "SKE".to_string(),
            schedule: "Mon-Wed 17:30".to_string(),
            room: "R.101".to_string(),
            student_count: 4,
            campus: "Nguyen Chi Thanh".to_string(),
        },
        Course {
            id: "c2".to_string(),
            name: "SuperKids SKE 4B".to_string(),
            code: "SKE".to_string(),
            schedule: "Tue-Thu 18:00".to_string(),
            room: "R.204".to_string(),
            student_count: 3,
            campus: "Nguyen Chi Thanh".to_string(),
        },
        Course {
            id: "c3".to_string(),
            name: "SuperKids SKG 2A".to_string(),
            code: "SKG".to_string(),
            schedule: "Sat-Sun 09:00".to_string(),
            room: "Lab 1".to_string(),
            student_count: 3,
            campus: "Nguyen Chi Thanh".to_string(),
        },
        Course {
            id: "c4".to_string(),
            name: "SuperKids SKG 5C".to_string(),
            code: "SKG".to_string(),
            schedule: "Sat-Sun 14:00".to_string(),
            room: "Lab 3".to_string(),
            student_count: 3,
            campus: "Nguyen Chi Thanh".to_string(),
        },
        Course {
            id: "c5".to_string(),
            name: "Young Leaders 6".to_string(),
            code: "YL".to_string(),
            schedule: "Mon-Wed 19:30".to_string(),
            room: "R.301".to_string(),
            student_count: 5,
            campus: "Nguyen Chi Thanh".to_string(),
        },
    ]
}

/// Demo roster for [`DEMO_ROSTER_COURSE_ID`]
pub fn demo_students() -> Vec<Student> {
    vec![
        Student {
            id: "s1".to_string(),
            name: "Hoàng Nhật Minh".to_string(),
            avatar_initials: "M".to_string(),
        },
        Student {
            id: "s2".to_string(),
            name: "Vũ Thị Mai Anh".to_string(),
            avatar_initials: "A".to_string(),
        },
        Student {
            id: "s3".to_string(),
            name: "Đặng Tuấn Kiệt".to_string(),
            avatar_initials: "K".to_string(),
        },
    ]
}

/// Demo answer keys, one per demo exam code
pub fn demo_answer_keys() -> Vec<AnswerKey> {
    vec![
        AnswerKey::new(
            "Starters - Reading & Writing Sample".to_string(),
            "SKE1".to_string(),
            "1. Tick\n2. Cross...".to_string(),
        ),
        AnswerKey::new(
            "Movers - Reading & Writing Test A".to_string(),
            "SKG1".to_string(),
            "1. Library...".to_string(),
        ),
        AnswerKey::new(
            "A2 Key (KET) - Reading Part 1 & 2".to_string(),
            "YC3".to_string(),
            "1. B\n2. A...".to_string(),
        ),
    ]
}

/// Load the demo set into a fresh application state.
pub async fn seed_demo_data(state: &AppState) {
    let keys = demo_answer_keys();
    let key_count = keys.len();
    state.answer_keys.replace_all(keys).await;

    let students = demo_students();
    let student_count = students.len();
    state
        .students_cache
        .write()
        .await
        .insert(DEMO_ROSTER_COURSE_ID.to_string(), students);

    tracing::info!(
        answer_keys = key_count,
        cached_students = student_count,
        "Demo data seeded"
    );
}
