//! Application state.

use std::time::Duration;

use crate::service::CourseService;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    service: CourseService,
    /// Deadline given to each request's context.
    request_timeout: Duration,
}

impl AppState {
    pub fn new(service: CourseService, request_timeout: Duration) -> Self {
        Self {
            service,
            request_timeout,
        }
    }

    pub fn service(&self) -> &CourseService {
        &self.service
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}
