//! Adapter-level responses: the error envelope and the landing page.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::config::ConfigError;
use crate::lifecycle::EngineError;
use crate::routing::Landing;

/// JSON body of every adapter failure.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: &'static str,
    pub error_description: String,
}

/// Failure owned by the adapter rather than the engine.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error(transparent)]
    Config(ConfigError),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl AdapterError {
    pub fn code(&self) -> &'static str {
        match self {
            AdapterError::Config(_) => "configuration_error",
            AdapterError::Unavailable(_) => "engine_unavailable",
            AdapterError::Internal(_) => "server_error",
        }
    }
}

impl From<EngineError> for AdapterError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Config(e) => AdapterError::Config(e),
            EngineError::Construction(reason) => {
                AdapterError::Unavailable(format!("engine construction failed: {reason}"))
            }
        }
    }
}

impl IntoResponse for AdapterError {
    fn into_response(self) -> Response {
        let body = ErrorEnvelope {
            error: self.code(),
            error_description: self.to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// `200 text/plain` landing page for the bare base path.
pub fn landing_response(landing: Landing) -> Response {
    let mut response = (StatusCode::OK, landing.body).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_config_error_envelope() {
        let err = AdapterError::from(EngineError::Config(ConfigError::MissingSetting {
            name: "ISSUER",
        }));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "configuration_error");
        assert!(body["error_description"].as_str().unwrap().contains("ISSUER"));
    }

    #[test]
    fn test_error_codes() {
        let unavailable = AdapterError::from(EngineError::Construction("no RSA key".into()));
        assert_eq!(unavailable.code(), "engine_unavailable");
        assert_eq!(AdapterError::Internal("x".into()).code(), "server_error");
    }
}
