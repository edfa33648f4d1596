//! Test helpers for course-server.

#![allow(dead_code, unused_imports)]

pub mod client;
pub mod doubles;

pub use client::{TestClient, TestResponse, app_with, client};
pub use doubles::{CacheCall, RecordingCache, RecordingStore, ServiceFixture, fixture, fixture_with};
