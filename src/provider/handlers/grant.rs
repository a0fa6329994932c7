//! Token endpoint (`POST /token`).

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::provider::engine::EngineState;
use crate::provider::error::ProtocolError;
use crate::provider::handlers::no_store;
use crate::provider::settings::{ClientMetadata, GrantType};
use crate::provider::store::{now_secs, PkceChallenge, TokenKind, TokenRecord};
use crate::provider::token::IdTokenRequest;

#[derive(Debug, Default, Deserialize)]
pub struct TokenRequest {
    pub grant_type: Option<String>,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub code_verifier: Option<String>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub scope: String,
}

/// Subject-bound grant shared by the code and refresh flows.
struct SessionGrant<'a> {
    sub: &'a str,
    scope: &'a str,
    auth_time: u64,
    nonce: Option<&'a str>,
}

pub async fn token_handler(
    State(state): State<Arc<EngineState>>,
    headers: HeaderMap,
    Form(req): Form<TokenRequest>,
) -> Response {
    let result = match state.clients.authenticate(&headers) {
        Ok(client) => dispatch(&state, client, &req),
        Err(e) => Err(e),
    };

    match result {
        Ok(body) => no_store(Json(body).into_response()),
        Err(e) => {
            tracing::debug!(error = e.error_code(), "Token request rejected");
            no_store(e.into_response())
        }
    }
}

fn dispatch(
    state: &EngineState,
    client: &ClientMetadata,
    req: &TokenRequest,
) -> Result<TokenResponse, ProtocolError> {
    let grant_type = req
        .grant_type
        .as_deref()
        .ok_or_else(|| ProtocolError::InvalidRequest("missing required parameter 'grant_type'".into()))?;
    let grant = GrantType::parse(grant_type).ok_or_else(|| {
        ProtocolError::UnsupportedGrantType(format!("unsupported grant_type '{grant_type}'"))
    })?;
    if !client.allows_grant(grant) {
        return Err(ProtocolError::UnauthorizedClient(format!(
            "{} is not allowed for this client",
            grant.as_str()
        )));
    }

    match grant {
        GrantType::AuthorizationCode => authorization_code(state, client, req),
        GrantType::RefreshToken => refresh_token(state, client, req),
        GrantType::ClientCredentials => Ok(client_credentials(state, client, req)),
    }
}

fn authorization_code(
    state: &EngineState,
    client: &ClientMetadata,
    req: &TokenRequest,
) -> Result<TokenResponse, ProtocolError> {
    let handle = req
        .code
        .as_deref()
        .ok_or_else(|| ProtocolError::InvalidRequest("missing required parameter 'code'".into()))?;
    let code = state
        .grants
        .take_code(handle)
        .ok_or_else(|| ProtocolError::InvalidGrant("authorization code not found or expired".into()))?;

    if code.client_id != client.client_id {
        return Err(ProtocolError::InvalidGrant(
            "authorization code client mismatch".into(),
        ));
    }
    if req.redirect_uri.as_deref() != Some(code.redirect_uri.as_str()) {
        return Err(ProtocolError::InvalidGrant(
            "authorization code redirect_uri mismatch".into(),
        ));
    }
    if let Some(pkce) = &code.pkce {
        let verifier = req.code_verifier.as_deref().ok_or_else(|| {
            ProtocolError::InvalidGrant("missing required parameter 'code_verifier'".into())
        })?;
        verify_pkce(pkce, verifier)?;
    }

    issue_session(
        state,
        client,
        SessionGrant {
            sub: &code.sub,
            scope: &code.scope,
            auth_time: code.auth_time,
            nonce: code.nonce.as_deref(),
        },
    )
}

fn refresh_token(
    state: &EngineState,
    client: &ClientMetadata,
    req: &TokenRequest,
) -> Result<TokenResponse, ProtocolError> {
    let handle = req.refresh_token.as_deref().ok_or_else(|| {
        ProtocolError::InvalidRequest("missing required parameter 'refresh_token'".into())
    })?;
    let record = state
        .grants
        .token(handle)
        .filter(|r| r.kind == TokenKind::Refresh)
        .ok_or_else(|| ProtocolError::InvalidGrant("refresh token not found or expired".into()))?;

    if record.client_id != client.client_id {
        return Err(ProtocolError::InvalidGrant("refresh token client mismatch".into()));
    }
    let sub = record
        .sub
        .clone()
        .ok_or_else(|| ProtocolError::InvalidGrant("refresh token has no subject".into()))?;

    // A narrower scope may be requested; never a wider one.
    let scope = match req.scope.as_deref() {
        Some(requested) => {
            let granted: Vec<&str> = record.scope.split_whitespace().collect();
            if let Some(extra) = requested.split_whitespace().find(|s| !granted.contains(s)) {
                return Err(ProtocolError::InvalidScope(format!(
                    "requested scope '{extra}' was not granted"
                )));
            }
            requested.split_whitespace().collect::<Vec<_>>().join(" ")
        }
        None => record.scope.clone(),
    };

    // Rotation: the presented refresh token is spent.
    if state.grants.revoke_token(handle).is_none() {
        return Err(ProtocolError::InvalidGrant("refresh token already used".into()));
    }

    issue_session(
        state,
        client,
        SessionGrant {
            sub: &sub,
            scope: &scope,
            auth_time: record.auth_time,
            nonce: None,
        },
    )
}

fn client_credentials(state: &EngineState, client: &ClientMetadata, req: &TokenRequest) -> TokenResponse {
    // Identity scopes have no meaning without an end user.
    let scope = req
        .scope
        .as_deref()
        .unwrap_or_default()
        .split_whitespace()
        .filter(|s| *s != "openid" && *s != "offline_access")
        .collect::<Vec<_>>()
        .join(" ");

    let now = now_secs();
    let access_token = state.grants.insert_token(TokenRecord {
        kind: TokenKind::Access,
        sub: None,
        client_id: client.client_id.clone(),
        scope: scope.clone(),
        auth_time: now,
        issued_at: now,
        expires_at: now + state.ttl.access_token,
    });

    TokenResponse {
        access_token,
        token_type: "Bearer",
        expires_in: state.ttl.access_token,
        id_token: None,
        refresh_token: None,
        scope,
    }
}

fn issue_session(
    state: &EngineState,
    client: &ClientMetadata,
    grant: SessionGrant<'_>,
) -> Result<TokenResponse, ProtocolError> {
    let account = (state.find_account)(grant.sub);
    let id_token = state.tokens.issue_id_token(IdTokenRequest {
        audience: &client.client_id,
        auth_time: grant.auth_time,
        nonce: grant.nonce,
        claims: account.for_scopes(grant.scope.split_whitespace()),
    })?;

    let now = now_secs();
    let access_token = state.grants.insert_token(TokenRecord {
        kind: TokenKind::Access,
        sub: Some(grant.sub.to_string()),
        client_id: client.client_id.clone(),
        scope: grant.scope.to_string(),
        auth_time: grant.auth_time,
        issued_at: now,
        expires_at: now + state.ttl.access_token,
    });

    let refresh_token = client.allows_grant(GrantType::RefreshToken).then(|| {
        state.grants.insert_token(TokenRecord {
            kind: TokenKind::Refresh,
            sub: Some(grant.sub.to_string()),
            client_id: client.client_id.clone(),
            scope: grant.scope.to_string(),
            auth_time: grant.auth_time,
            issued_at: now,
            expires_at: now + state.ttl.refresh_token,
        })
    });

    Ok(TokenResponse {
        access_token,
        token_type: "Bearer",
        expires_in: state.ttl.access_token,
        id_token: Some(id_token),
        refresh_token,
        scope: grant.scope.to_string(),
    })
}

/// RFC 7636 §4.6 verifier check.
fn verify_pkce(pkce: &PkceChallenge, verifier: &str) -> Result<(), ProtocolError> {
    let well_formed = (43..=128).contains(&verifier.len())
        && verifier
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~'));
    if !well_formed {
        return Err(ProtocolError::InvalidGrant("code_verifier is malformed".into()));
    }

    let computed = match pkce.method.as_str() {
        "S256" => URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes())),
        _ => verifier.to_string(),
    };
    let matches: bool = computed.as_bytes().ct_eq(pkce.challenge.as_bytes()).into();
    if matches {
        Ok(())
    } else {
        Err(ProtocolError::InvalidGrant("PKCE verification failed".into()))
    }
}
