//! Course operations.

mod course;

pub use course::{CourseService, ServiceConfig};
