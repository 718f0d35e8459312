//! test_utils 模块的集成测试

use std::collections::HashSet;

use agrilearn_shared::test_utils::*;
use chrono::{Duration, Utc};

#[test]
fn test_user_ids_are_unique() {
    let ids: HashSet<String> = (0..100).map(|_| test_user_id()).collect();
    assert_eq!(ids.len(), 100);
    assert!(ids.iter().all(|id| id.starts_with("test-user-")));
}

#[test]
fn test_course_ids_are_unique_per_call() {
    let first = test_course_id("course");
    let second = test_course_id("course");
    assert_ne!(first, second);
    assert!(first.starts_with("course-"));
}

#[test]
fn test_lesson_ids_numbered_from_one() {
    let ids = lesson_ids("cacao-basics", 3);
    assert_eq!(
        ids,
        vec![
            "cacao-basics-lesson-1",
            "cacao-basics-lesson-2",
            "cacao-basics-lesson-3"
        ]
    );
    assert!(lesson_ids("empty", 0).is_empty());
}

#[test]
fn test_database_config_defaults() {
    let config = test_database_config();
    assert!(config.url.starts_with("postgres://"));
    assert_eq!(config.max_connections, 5);
    assert!(config.min_connections <= config.max_connections);
}

#[test]
fn test_assert_time_within_accepts_close_times() {
    let now = Utc::now();
    assert_time_within(now, now + Duration::milliseconds(200), Duration::seconds(1));
    assert_time_within(now + Duration::milliseconds(200), now, Duration::seconds(1));
}

#[test]
#[should_panic(expected = "exceeds tolerance")]
fn test_assert_time_within_rejects_distant_times() {
    let now = Utc::now();
    assert_time_within(now, now + Duration::minutes(5), Duration::seconds(1));
}
