//! HTTP test client.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use course_server::cache::{Cache, MokaCache, MokaCacheConfig};
use course_server::metrics::detached_handle;
use course_server::{AppState, CourseService, ServiceConfig, create_router};
use course_store::{DocumentStore, MemoryStore};
use http_body_util::BodyExt;
use tower::ServiceExt;

/// Drives a router in-process through `oneshot`.
pub struct TestClient {
    app: Router,
}

impl TestClient {
    pub fn new(app: Router) -> Self {
        Self { app }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    /// GET with extra request headers.
    pub async fn get_with_headers(&self, uri: &str, headers: Vec<(&str, &str)>) -> TestResponse {
        let mut builder = Request::get(uri);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }

        self.request(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(&self, uri: &str, body: &str) -> TestResponse {
        self.send_json("POST", uri, body).await
    }

    pub async fn put_json(&self, uri: &str, body: &str) -> TestResponse {
        self.send_json("PUT", uri, body).await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.request(Request::delete(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn send_json(&self, method: &str, uri: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        self.request(request).await
    }

    async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");

        TestResponse::from_response(response).await
    }
}

/// A fully read response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    async fn from_response(response: Response<Body>) -> Self {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes()
            .to_vec();

        Self {
            status,
            headers,
            body,
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("Body is not valid UTF-8")
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse JSON")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {} but got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
        self
    }

    pub fn assert_header(&self, name: &str, expected: &str) -> &Self {
        let value = self
            .header(name)
            .unwrap_or_else(|| panic!("Header '{}' not found", name));

        assert_eq!(value, expected, "Unexpected value for header '{}'", name);
        self
    }
}

/// Router over the given backends with default service settings.
pub fn app_with(store: Arc<dyn DocumentStore>, cache: Arc<dyn Cache>) -> Router {
    let service = CourseService::new(store, cache, ServiceConfig::default());
    let state = AppState::new(service, Duration::from_secs(5));
    create_router(state, detached_handle())
}

/// Client over a fresh in-memory store and Moka cache.
pub async fn client() -> TestClient {
    let store = Arc::new(MemoryStore::new());
    store
        .ensure_index(&ServiceConfig::default().collection, "name", true)
        .await
        .unwrap();

    TestClient::new(app_with(
        store,
        Arc::new(MokaCache::new(MokaCacheConfig::default())),
    ))
}
