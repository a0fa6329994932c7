//! Bearer-protected and client-authenticated token endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};

use crate::provider::engine::EngineState;
use crate::provider::error::ProtocolError;
use crate::provider::handlers::no_store;
use crate::provider::store::TokenKind;

#[derive(Debug, Default, Deserialize)]
pub struct TokenForm {
    pub token: Option<String>,
    pub token_type_hint: Option<String>,
}

/// RFC 7662 introspection response.
#[derive(Debug, Default, Serialize)]
pub struct IntrospectionResponse {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<&'static str>,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// `GET|POST /me`
pub async fn userinfo_handler(
    State(state): State<Arc<EngineState>>,
    headers: HeaderMap,
) -> Response {
    let Some(handle) = bearer_token(&headers) else {
        return ProtocolError::InvalidToken("no access token provided".into()).into_response();
    };

    let record = match state.grants.token(handle) {
        Some(r) if r.kind == TokenKind::Access => r,
        _ => return ProtocolError::InvalidToken("invalid token provided".into()).into_response(),
    };
    let Some(sub) = record.sub.as_deref() else {
        return ProtocolError::InvalidToken("token is not bound to an end user".into())
            .into_response();
    };
    if !record.scope.split_whitespace().any(|s| s == "openid") {
        return ProtocolError::InvalidToken("token does not carry the openid scope".into())
            .into_response();
    }

    let claims = (state.find_account)(sub).for_scopes(record.scope.split_whitespace());
    no_store(Json(claims).into_response())
}

/// `POST /token/introspection`
pub async fn introspection_handler(
    State(state): State<Arc<EngineState>>,
    headers: HeaderMap,
    Form(form): Form<TokenForm>,
) -> Response {
    let client = match state.clients.authenticate(&headers) {
        Ok(c) => c,
        Err(e) => return e.into_response(),
    };
    let Some(token) = form.token.as_deref() else {
        return ProtocolError::InvalidRequest("missing required parameter 'token'".into())
            .into_response();
    };

    let body = match state.grants.token(token) {
        // Clients may only introspect their own tokens.
        Some(record) if record.client_id == client.client_id => IntrospectionResponse {
            active: true,
            sub: Some(record.sub.clone().unwrap_or_else(|| record.client_id.clone())),
            client_id: Some(record.client_id.clone()),
            scope: Some(record.scope.clone()),
            exp: Some(record.expires_at),
            iat: Some(record.issued_at),
            iss: Some(state.issuer.clone()),
            token_type: Some(record.kind.as_str()),
        },
        _ => IntrospectionResponse::default(),
    };

    tracing::debug!(
        client_id = %client.client_id,
        hint = form.token_type_hint.as_deref().unwrap_or("none"),
        active = body.active,
        "Token introspected"
    );
    no_store(Json(body).into_response())
}

/// `POST /token/revocation`: always 200, per RFC 7009 §2.2.
pub async fn revocation_handler(
    State(state): State<Arc<EngineState>>,
    headers: HeaderMap,
    Form(form): Form<TokenForm>,
) -> Response {
    let client = match state.clients.authenticate(&headers) {
        Ok(c) => c,
        Err(e) => return e.into_response(),
    };
    let Some(token) = form.token.as_deref() else {
        return ProtocolError::InvalidRequest("missing required parameter 'token'".into())
            .into_response();
    };

    let owned = state
        .grants
        .token(token)
        .is_some_and(|r| r.client_id == client.client_id);
    if owned {
        state.grants.revoke_token(token);
        tracing::debug!(client_id = %client.client_id, "Token revoked");
    }

    StatusCode::OK.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_inactive_introspection_is_minimal() {
        let body = serde_json::to_value(IntrospectionResponse::default()).unwrap();
        assert_eq!(body, serde_json::json!({ "active": false }));
    }
}
