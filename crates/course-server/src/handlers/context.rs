//! Per-request context extraction.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use course_core::RequestContext;

use crate::middleware::RequestId;
use crate::state::AppState;

/// The [`RequestContext`] of the current request: a deadline of
/// `request_timeout` from arrival, tagged with the request ID.
///
/// All cache and store calls made for the request share this deadline.
pub struct RequestCtx(pub RequestContext);

impl FromRequestParts<AppState> for RequestCtx {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let mut ctx = RequestContext::with_timeout(state.request_timeout());
        if let Some(id) = parts.extensions.get::<RequestId>() {
            ctx = ctx.with_request_id(id.as_str());
        }
        Ok(Self(ctx))
    }
}
