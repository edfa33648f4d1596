#![allow(dead_code)]
use course_core::Course;

/// A fully populated course fixture.
pub fn full_course(name: &str) -> Course {
    Course::new(name)
        .with_price(10.0)
        .with_picture(format!("img/{name}.png"))
        .with_preview_url_video(format!("https://videos.example.com/{name}"))
}

/// Parses a course from a JSON string slice.
/// Panics if the JSON is invalid (intended for tests).
pub fn course_from_json(json: &str) -> Course {
    serde_json::from_str(json).expect("Failed to create test course from JSON")
}
