use std::time::Duration;

use axum::{Json, extract::State, http::StatusCode};
use course_core::RequestContext;
use serde::Serialize;

use crate::state::AppState;

const CHECK_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store: ComponentHealth,
    pub cache: ComponentHealth,
}

#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub backend: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentHealth {
    fn from_result<E: std::fmt::Display>(backend: &str, result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self {
                backend: backend.to_string(),
                status: "UP",
                error: None,
            },
            Err(err) => Self {
                backend: backend.to_string(),
                status: "DOWN",
                error: Some(err.to_string()),
            },
        }
    }

    fn is_up(&self) -> bool {
        self.status == "UP"
    }
}

/// Reports `UP` unless the store is unreachable. A failing cache only
/// degrades the service and is reported without changing the status.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let ctx = RequestContext::background();
    let service = state.service();

    let store = ctx
        .bound(CHECK_TIMEOUT, service.store().health_check())
        .await
        .map_err(|e| e.to_string())
        .and_then(|r| r.map_err(|e| e.to_string()));
    let cache = ctx
        .bound(CHECK_TIMEOUT, service.cache().health_check())
        .await
        .map_err(|e| e.to_string())
        .and_then(|r| r.map_err(|e| e.to_string()));

    let store = ComponentHealth::from_result(service.store().name(), store);
    let cache = ComponentHealth::from_result(service.cache().name(), cache);

    let (code, status) = if store.is_up() {
        (StatusCode::OK, "UP")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "DOWN")
    };

    (code, Json(HealthResponse { status, store, cache }))
}
