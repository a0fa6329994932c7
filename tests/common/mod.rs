//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use oidc_mock::config::{load_from, ServerConfig};
use oidc_mock::lifecycle::{build_engine_from, EngineManager};
use oidc_mock::provider::Engine;
use oidc_mock::HttpServer;

/// RSA-2048 private key set, generated once for the test suite.
pub const SIGNING_JWKS: &str = include_str!("../fixtures/signing_jwks.json");

pub const ISSUER: &str = "http://localhost:3000/api/oidc";
pub const CLIENT_ID: &str = "test-client";
pub const CLIENT_SECRET: &str = "test-secret";
pub const REDIRECT_URI: &str = "http://localhost:3000/callback";
pub const COOKIE_SECRET: &str = "cookie-secret-one";

/// A complete, valid environment.
pub fn valid_env() -> HashMap<String, String> {
    HashMap::from([
        ("ISSUER".to_string(), ISSUER.to_string()),
        ("CLIENT_ID".to_string(), CLIENT_ID.to_string()),
        ("CLIENT_SECRET".to_string(), CLIENT_SECRET.to_string()),
        ("REDIRECT_URIS".to_string(), REDIRECT_URI.to_string()),
        (
            "COOKIE_KEYS".to_string(),
            format!(r#"["{COOKIE_SECRET}","cookie-secret-two"]"#),
        ),
        ("SIGNING_JWKS".to_string(), SIGNING_JWKS.to_string()),
    ])
}

/// Engine manager reading `env` instead of the process environment.
/// The returned counter tracks construction attempts.
pub fn manager_from(env: HashMap<String, String>) -> (Arc<EngineManager<Engine>>, Arc<AtomicUsize>) {
    let env = Arc::new(env);
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();

    let manager = EngineManager::new(move || {
        let env = env.clone();
        counter.fetch_add(1, Ordering::SeqCst);
        async move {
            let config = load_from(|name| env.get(name).cloned())?;
            build_engine_from(config).await
        }
    });
    (Arc::new(manager), attempts)
}

/// Fully layered application router over `env`.
pub fn app(env: HashMap<String, String>) -> Router {
    let (manager, _) = manager_from(env);
    HttpServer::new(&ServerConfig::default(), manager).router()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// `Authorization: Basic` value for the test client.
pub fn basic_auth(client_id: &str, secret: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{client_id}:{secret}")))
}

/// Form-encoded POST with client credentials.
pub fn client_post(uri: &str, form: &[(&str, &str)], secret: &str) -> Request<Body> {
    let body = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(form)
        .finish();
    Request::post(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .header("authorization", basic_auth(CLIENT_ID, secret))
        .body(Body::from(body))
        .unwrap()
}
