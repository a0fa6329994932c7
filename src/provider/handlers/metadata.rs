use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::provider::engine::EngineState;
use crate::provider::error::ProtocolError;

/// `GET /.well-known/openid-configuration`
pub async fn discovery_handler(State(state): State<Arc<EngineState>>) -> Response {
    match state.documents.get() {
        Some(docs) => Json(docs.discovery.clone()).into_response(),
        None => ProtocolError::Internal("engine has not been initialized".into()).into_response(),
    }
}

/// `GET /jwks`: public halves of the signing keys.
pub async fn jwks_handler(State(state): State<Arc<EngineState>>) -> Response {
    match state.documents.get() {
        Some(docs) => Json(docs.jwks.clone()).into_response(),
        None => ProtocolError::Internal("engine has not been initialized".into()).into_response(),
    }
}
