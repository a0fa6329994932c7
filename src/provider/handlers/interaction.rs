//! Authorization endpoint and the built-in dev interaction pages.
//!
//! ```text
//! GET /auth ──validate──▶ Interaction stored ──303 + _interaction cookie──▶
//! GET /interaction/{uid} ──login form──▶ POST /interaction/{uid}/login
//!     ──AuthorizationCode stored──▶ 303 redirect_uri?code=..&state=..&iss=..
//! ```

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Form;
use serde::Deserialize;

use crate::provider::cookies::CookieSigner;
use crate::provider::engine::EngineState;
use crate::provider::error::ProtocolError;
use crate::provider::handlers::escape_html;
use crate::provider::settings::GrantType;
use crate::provider::store::{now_secs, AuthorizationCode, Interaction, PkceChallenge};

#[derive(Debug, Default, Deserialize)]
pub struct AuthorizationParams {
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub response_type: Option<String>,
    pub scope: Option<String>,
    pub state: Option<String>,
    pub nonce: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub login: Option<String>,
}

/// `303 See Other` with a `Location` header and optional `Set-Cookie`.
fn see_other(location: &str, cookie: Option<String>) -> Response {
    let mut response = StatusCode::SEE_OTHER.into_response();
    let headers = response.headers_mut();
    match HeaderValue::from_str(location) {
        Ok(value) => {
            headers.insert(header::LOCATION, value);
        }
        Err(_) => {
            return ProtocolError::Internal("redirect target is not a valid header".into())
                .into_response()
        }
    }
    if let Some(value) = cookie.and_then(|c| HeaderValue::from_str(&c).ok()) {
        headers.insert(header::SET_COOKIE, value);
    }
    response
}

/// Appends authorization response parameters to the client's redirect URI.
fn redirect_with(redirect_uri: &str, params: &[(&str, &str)]) -> Result<String, ProtocolError> {
    let mut url = url::Url::parse(redirect_uri)
        .map_err(|_| ProtocolError::InvalidRequest("redirect_uri is not a valid URL".into()))?;
    {
        let mut pairs = url.query_pairs_mut();
        for (name, value) in params {
            pairs.append_pair(name, value);
        }
    }
    Ok(url.into())
}

/// Error delivered to the client's redirect URI.
fn error_redirect(
    state: &EngineState,
    redirect_uri: &str,
    error: &str,
    description: &str,
    client_state: Option<&str>,
    cookie: Option<String>,
) -> Response {
    let mut params = vec![("error", error), ("error_description", description)];
    if let Some(s) = client_state {
        params.push(("state", s));
    }
    params.push(("iss", state.issuer.as_str()));

    match redirect_with(redirect_uri, &params) {
        Ok(location) => see_other(&location, cookie),
        Err(e) => e.into_response(),
    }
}

/// `GET /auth`
pub async fn authorization_handler(
    State(state): State<Arc<EngineState>>,
    Query(params): Query<AuthorizationParams>,
) -> Response {
    let client_id = match params.client_id.as_deref().filter(|s| !s.is_empty()) {
        Some(id) => id,
        None => {
            return ProtocolError::InvalidRequest("missing required parameter 'client_id'".into())
                .into_response()
        }
    };
    let Some(client) = state.clients.get(client_id) else {
        return ProtocolError::InvalidClient("client is invalid".into()).into_response();
    };

    // Until the redirect URI is trusted, errors are rendered in place.
    let redirect_uri = match params.redirect_uri.as_deref() {
        Some(uri) if client.redirect_uris.iter().any(|r| r == uri) => uri,
        Some(_) => {
            return ProtocolError::InvalidRequest(
                "redirect_uri did not match any of the client's registered redirect_uris".into(),
            )
            .into_response()
        }
        None => {
            return ProtocolError::InvalidRequest("missing required parameter 'redirect_uri'".into())
                .into_response()
        }
    };
    let client_state = params.state.as_deref();
    let fail = |error: &str, description: &str| {
        error_redirect(&state, redirect_uri, error, description, client_state, None)
    };

    match params.response_type.as_deref() {
        Some("code") => {}
        Some(_) => {
            return fail(
                "unsupported_response_type",
                "unsupported response_type requested",
            )
        }
        None => return fail("invalid_request", "missing required parameter 'response_type'"),
    }
    if !client.response_types.iter().any(|r| r == "code")
        || !client.allows_grant(GrantType::AuthorizationCode)
    {
        return fail(
            "unauthorized_client",
            "requested response_type is not allowed for this client",
        );
    }

    let scope = params.scope.clone().unwrap_or_default();
    if !scope.split_whitespace().any(|s| s == "openid") {
        return fail("invalid_scope", "openid scope must be requested");
    }

    let pkce = match (params.code_challenge.as_deref(), params.code_challenge_method.as_deref()) {
        (None, None) => None,
        (None, Some(_)) => {
            return fail("invalid_request", "code_challenge_method requires code_challenge")
        }
        (Some(challenge), method) => {
            let method = method.unwrap_or("plain");
            if method != "S256" && method != "plain" {
                return fail("invalid_request", "not supported value of code_challenge_method");
            }
            Some(PkceChallenge {
                challenge: challenge.to_string(),
                method: method.to_string(),
            })
        }
    };

    if !state.features.dev_interactions {
        return fail("login_required", "no interactive login is available");
    }

    let uid = state.grants.insert_interaction(Interaction {
        client_id: client.client_id.clone(),
        redirect_uri: redirect_uri.to_string(),
        scope,
        state: params.state.clone(),
        nonce: params.nonce.clone(),
        pkce,
        expires_at: now_secs() + state.ttl.interaction,
    });

    let Some(cookie) =
        state
            .cookies
            .interaction_cookie(&uid, &state.cookie_path(), state.ttl.interaction)
    else {
        return ProtocolError::Internal("no cookie key available".into()).into_response();
    };

    tracing::debug!(client_id = %client.client_id, uid = %uid, "Interaction started");
    see_other(&state.url(&format!("/interaction/{uid}")), Some(cookie))
}

/// Interaction bound to this browser, if the cookie names `uid`.
fn bound_interaction(
    state: &EngineState,
    headers: &HeaderMap,
    uid: &str,
) -> Result<Interaction, ProtocolError> {
    let cookie_uid = state
        .cookies
        .interaction_uid(headers)
        .ok_or_else(|| ProtocolError::InvalidRequest("interaction session not found".into()))?;
    if cookie_uid != uid {
        return Err(ProtocolError::InvalidRequest(
            "interaction session does not match".into(),
        ));
    }
    state
        .grants
        .interaction(uid)
        .ok_or_else(|| ProtocolError::InvalidRequest("interaction expired or not found".into()))
}

fn login_page(
    state: &EngineState,
    uid: &str,
    interaction: &Interaction,
    notice: Option<&str>,
) -> Html<String> {
    let action = escape_html(&state.url(&format!("/interaction/{uid}/login")));
    let abort = escape_html(&state.url(&format!("/interaction/{uid}/abort")));
    let notice = notice
        .map(|n| format!("<p class=\"notice\">{}</p>", escape_html(n)))
        .unwrap_or_default();

    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Sign-in</title></head>\n<body>\n\
         <h1>Sign-in</h1>\n\
         <p>Client <code>{client}</code> requests <code>{scope}</code>.</p>\n\
         {notice}\
         <form method=\"post\" action=\"{action}\" autocomplete=\"off\">\n\
         <input required type=\"text\" name=\"login\" placeholder=\"Enter any login\" autofocus>\n\
         <button type=\"submit\">Sign-in</button>\n\
         </form>\n\
         <p><a href=\"{abort}\">Cancel</a></p>\n\
         </body>\n</html>\n",
        client = escape_html(&interaction.client_id),
        scope = escape_html(&interaction.scope),
    ))
}

/// `GET /interaction/{uid}`
pub async fn login_page_handler(
    State(state): State<Arc<EngineState>>,
    Path(uid): Path<String>,
    headers: HeaderMap,
) -> Response {
    match bound_interaction(&state, &headers, &uid) {
        Ok(interaction) => login_page(&state, &uid, &interaction, None).into_response(),
        Err(e) => e.into_response(),
    }
}

/// `POST /interaction/{uid}/login`: any non-empty login becomes the subject.
pub async fn login_submit_handler(
    State(state): State<Arc<EngineState>>,
    Path(uid): Path<String>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let interaction = match bound_interaction(&state, &headers, &uid) {
        Ok(i) => i,
        Err(e) => return e.into_response(),
    };

    let login = form.login.as_deref().map(str::trim).unwrap_or_default();
    if login.is_empty() {
        let page = login_page(&state, &uid, &interaction, Some("A login is required."));
        return (StatusCode::BAD_REQUEST, page).into_response();
    }

    let Some(interaction) = state.grants.finish_interaction(&uid) else {
        return ProtocolError::InvalidRequest("interaction expired or not found".into())
            .into_response();
    };

    let now = now_secs();
    let code = state.grants.insert_code(AuthorizationCode {
        sub: login.to_string(),
        client_id: interaction.client_id.clone(),
        redirect_uri: interaction.redirect_uri.clone(),
        scope: interaction.scope.clone(),
        nonce: interaction.nonce.clone(),
        pkce: interaction.pkce.clone(),
        auth_time: now,
        expires_at: now + state.ttl.authorization_code,
    });

    tracing::info!(client_id = %interaction.client_id, sub = %login, "Dev interaction login");

    let mut params = vec![("code", code.as_str())];
    if let Some(s) = interaction.state.as_deref() {
        params.push(("state", s));
    }
    params.push(("iss", state.issuer.as_str()));

    let clear = CookieSigner::clear_interaction_cookie(&state.cookie_path());
    match redirect_with(&interaction.redirect_uri, &params) {
        Ok(location) => see_other(&location, Some(clear)),
        Err(e) => e.into_response(),
    }
}

/// `GET|POST /interaction/{uid}/abort`
pub async fn abort_handler(
    State(state): State<Arc<EngineState>>,
    Path(uid): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(e) = bound_interaction(&state, &headers, &uid) {
        return e.into_response();
    }
    let Some(interaction) = state.grants.finish_interaction(&uid) else {
        return ProtocolError::InvalidRequest("interaction expired or not found".into())
            .into_response();
    };

    error_redirect(
        &state,
        &interaction.redirect_uri,
        "access_denied",
        "End-User aborted interaction",
        interaction.state.as_deref(),
        Some(CookieSigner::clear_interaction_cookie(&state.cookie_path())),
    )
}
