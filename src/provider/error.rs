use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// OAuth 2.0 error response per RFC 6749 Section 5.2.
#[derive(Debug, Serialize)]
pub struct ProtocolErrorBody {
    pub error: &'static str,
    pub error_description: String,
}

/// Protocol-level error answered by the engine itself.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProtocolError {
    /// Missing or malformed request parameters.
    #[error("invalid_request: {0}")]
    InvalidRequest(String),
    /// Unknown client or bad client credentials.
    #[error("invalid_client: {0}")]
    InvalidClient(String),
    /// Code, refresh token or PKCE verifier rejected.
    #[error("invalid_grant: {0}")]
    InvalidGrant(String),
    /// Grant type not in the client's policy.
    #[error("unauthorized_client: {0}")]
    UnauthorizedClient(String),
    /// Grant type the engine does not implement.
    #[error("unsupported_grant_type: {0}")]
    UnsupportedGrantType(String),
    /// Requested scope missing `openid` or otherwise unusable.
    #[error("invalid_scope: {0}")]
    InvalidScope(String),
    /// Missing, unknown or expired bearer token.
    #[error("invalid_token: {0}")]
    InvalidToken(String),
    /// Engine not ready or an internal failure.
    #[error("server_error: {0}")]
    Internal(String),
}

impl ProtocolError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ProtocolError::InvalidRequest(_) => "invalid_request",
            ProtocolError::InvalidClient(_) => "invalid_client",
            ProtocolError::InvalidGrant(_) => "invalid_grant",
            ProtocolError::UnauthorizedClient(_) => "unauthorized_client",
            ProtocolError::UnsupportedGrantType(_) => "unsupported_grant_type",
            ProtocolError::InvalidScope(_) => "invalid_scope",
            ProtocolError::InvalidToken(_) => "invalid_token",
            ProtocolError::Internal(_) => "server_error",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ProtocolError::InvalidClient(_) | ProtocolError::InvalidToken(_) => {
                StatusCode::UNAUTHORIZED
            }
            ProtocolError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            ProtocolError::InvalidRequest(s)
            | ProtocolError::InvalidClient(s)
            | ProtocolError::InvalidGrant(s)
            | ProtocolError::UnauthorizedClient(s)
            | ProtocolError::UnsupportedGrantType(s)
            | ProtocolError::InvalidScope(s)
            | ProtocolError::InvalidToken(s)
            | ProtocolError::Internal(s) => s,
        }
    }
}

impl IntoResponse for ProtocolError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let challenge = match &self {
            ProtocolError::InvalidClient(_) => Some("Basic realm=\"token\""),
            ProtocolError::InvalidToken(_) => Some("Bearer error=\"invalid_token\""),
            _ => None,
        };
        let body = ProtocolErrorBody {
            error: self.error_code(),
            error_description: self.description().to_string(),
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(challenge) = challenge {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(challenge));
        }
        response
    }
}

/// Failure while building the engine or during its readiness step.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BuildError {
    #[error("signing key '{kid}': {reason}")]
    SigningKey { kid: String, reason: String },

    #[error("no RSA signing key available (RS256 is the only supported algorithm)")]
    NoRsaKey,

    #[error("no client registered")]
    NoClient,

    #[error("readiness check failed: {0}")]
    Readiness(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_code() {
        let resp = ProtocolError::InvalidGrant("bad code".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = ProtocolError::InvalidClient("nope".into()).into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));

        assert_eq!(ProtocolError::Internal("x".into()).error_code(), "server_error");
    }
}
