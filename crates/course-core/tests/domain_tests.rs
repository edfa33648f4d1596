use std::time::Duration;

use course_core::{
    CacheOperation, CacheWarning, Course, ErrorKind, Interrupted, Outcome, RequestContext, Result,
    ServiceError,
};

mod common;

#[test]
fn test_lookup_workflow() {
    fn lookup(name: &str) -> Result<Outcome<Course>> {
        if name == "ghost" {
            return Err(ServiceError::not_found(name));
        }
        let mut outcome = Outcome::new(common::full_course(name));
        outcome.warn(CacheWarning::new(
            CacheOperation::Set,
            format!("course:one:{name}"),
            "cache unavailable",
        ));
        Ok(outcome)
    }

    let found = lookup("algebra").unwrap();
    assert!(found.is_degraded());
    assert_eq!(found.value().name, "algebra");

    let missing = lookup("ghost").unwrap_err();
    match missing.kind() {
        ErrorKind::NotFound => {},
        other => panic!("Expected NotFound, got {other}"),
    }
}

#[test]
fn test_error_kind_labels() {
    assert_eq!(ErrorKind::NotFound.as_str(), "not_found");
    assert_eq!(ErrorKind::StoreFailure.as_str(), "store_failure");
    assert_eq!(ErrorKind::CacheFailure.as_str(), "cache_failure");
}

#[test]
fn test_strict_mode_keeps_clean_results() {
    let outcome = Outcome::new(vec![Course::new("a"), Course::new("b")]);
    let courses = outcome.strict().unwrap();

    assert_eq!(courses.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_bounds_nested_calls() {
    let ctx = RequestContext::with_timeout(Duration::from_millis(300));

    let first = ctx
        .bound(Duration::from_secs(1), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            "first"
        })
        .await;
    assert_eq!(first, Ok("first"));

    // Only ~100ms of the request budget is left for the second call.
    let second = ctx
        .bound(Duration::from_secs(1), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            "second"
        })
        .await;
    assert!(matches!(second, Err(Interrupted::DeadlineExceeded(_))));
}
