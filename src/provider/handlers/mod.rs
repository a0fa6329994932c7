//! Engine endpoint handlers.

pub mod grant;
pub mod interaction;
pub mod metadata;
pub mod resource;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::provider::error::ProtocolErrorBody;

pub async fn not_found_handler() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ProtocolErrorBody {
            error: "invalid_request",
            error_description: "unrecognized route or not allowed method".to_string(),
        }),
    )
        .into_response()
}

/// Token material must never be cached by intermediaries.
pub(crate) fn no_store(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    response
}

pub(crate) fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
