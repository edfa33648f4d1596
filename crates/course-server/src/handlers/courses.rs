//! Course CRUD endpoints.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use course_core::{Course, Outcome};
use serde::Serialize;
use tracing::instrument;

use super::context::RequestCtx;
use crate::error::AppError;
use crate::state::AppState;

/// Set when the response was produced with a degraded cache; the value is the
/// number of cache problems met.
pub static CACHE_DEGRADED_HEADER: HeaderName = HeaderName::from_static("x-cache-degraded");

/// GET /courses/{name}
#[instrument(skip(state, ctx))]
pub async fn get_course(
    State(state): State<AppState>,
    ctx: RequestCtx,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    let outcome = state.service().find_one(&ctx.0, &name).await?;
    Ok(respond(StatusCode::OK, outcome))
}

/// GET /courses
#[instrument(skip(state, ctx))]
pub async fn list_courses(
    State(state): State<AppState>,
    ctx: RequestCtx,
) -> Result<Response, AppError> {
    let outcome = state.service().find_all(&ctx.0).await?;
    Ok(respond(StatusCode::OK, outcome))
}

/// POST /courses
#[instrument(skip(state, ctx, body))]
pub async fn create_course(
    State(state): State<AppState>,
    ctx: RequestCtx,
    body: Result<Json<Course>, JsonRejection>,
) -> Result<Response, AppError> {
    let course = parse_course(body)?;
    let outcome = state.service().create(&ctx.0, course.clone()).await?;
    Ok(respond(StatusCode::CREATED, outcome.map(|()| course)))
}

/// PUT /courses
#[instrument(skip(state, ctx, body))]
pub async fn update_course(
    State(state): State<AppState>,
    ctx: RequestCtx,
    body: Result<Json<Course>, JsonRejection>,
) -> Result<Response, AppError> {
    let course = parse_course(body)?;
    let outcome = state.service().update(&ctx.0, course.clone()).await?;
    Ok(respond(StatusCode::CREATED, outcome.map(|()| course)))
}

/// DELETE /courses/{name}
#[instrument(skip(state, ctx))]
pub async fn delete_course(
    State(state): State<AppState>,
    ctx: RequestCtx,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    let outcome = state.service().delete(&ctx.0, &name).await?;
    Ok(respond(StatusCode::OK, outcome.map(|()| "")))
}

fn parse_course(body: Result<Json<Course>, JsonRejection>) -> Result<Course, AppError> {
    let Json(course) = body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    Ok(course)
}

fn respond<T: Serialize>(status: StatusCode, outcome: Outcome<T>) -> Response {
    let (value, warnings) = outcome.into_parts();
    let mut response = (status, Json(value)).into_response();

    if !warnings.is_empty() {
        response
            .headers_mut()
            .insert(CACHE_DEGRADED_HEADER.clone(), HeaderValue::from(warnings.len()));
    }

    response
}
