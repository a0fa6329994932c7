//! Request identification and rewriting.
//!
//! # Responsibilities
//! - Assign a UUID v4 `x-request-id` to every request and echo it back
//! - Rebuild the request URI from the normalized path before delegation
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Rewriting produces a new request; method, headers and body move over unchanged

use axum::body::Body;
use axum::http::{HeaderName, Request, Uri};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::http::response::AdapterError;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Sets `x-request-id` on requests that arrive without one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID), MakeRequestUuid)
}

/// Copies the request's `x-request-id` onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID))
}

/// Access to the correlation id assigned by [`set_request_id_layer`].
pub trait RequestIdExt {
    fn request_id(&self) -> &str;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> &str {
        self.headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
    }
}

/// Replaces the request's path and query, keeping everything else.
pub fn rewrite_uri(request: Request<Body>, path_and_query: &str) -> Result<Request<Body>, AdapterError> {
    let (mut parts, body) = request.into_parts();

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.path_and_query = Some(
        path_and_query
            .parse()
            .map_err(|e| AdapterError::Internal(format!("normalized path is not a valid URI: {e}")))?,
    );
    parts.uri = Uri::from_parts(uri_parts)
        .map_err(|e| AdapterError::Internal(format!("cannot rebuild request URI: {e}")))?;

    Ok(Request::from_parts(parts, body))
}
