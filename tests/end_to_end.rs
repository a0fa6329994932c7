//! End-to-end tests through the public entry point.

use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::Value;

use oidc_mock::config::ServerConfig;
use oidc_mock::lifecycle::Shutdown;
use oidc_mock::HttpServer;

mod common;
use common::*;

const VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
const CHALLENGE: &str = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";

fn public_path(absolute: &str) -> String {
    absolute
        .strip_prefix("http://localhost:3000")
        .expect("engine URL under the issuer origin")
        .to_string()
}

fn query_param(location: &str, name: &str) -> Option<String> {
    url::Url::parse(location)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

#[tokio::test]
async fn test_discovery_through_base_path() {
    let app = app(valid_env());
    let response = get(&app, "/api/oidc/.well-known/openid-configuration").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let doc = body_json(response).await;
    for field in ["issuer", "authorization_endpoint", "token_endpoint", "jwks_uri"] {
        assert!(doc.get(field).is_some(), "discovery is missing {field}");
    }
    assert_eq!(doc["issuer"], ISSUER);
    assert_eq!(doc["authorization_endpoint"], format!("{ISSUER}/auth"));
    assert_eq!(doc["jwks_uri"], format!("{ISSUER}/jwks"));
    assert_eq!(doc["introspection_endpoint"], format!("{ISSUER}/token/introspection"));
    assert_eq!(doc["revocation_endpoint"], format!("{ISSUER}/token/revocation"));
}

#[tokio::test]
async fn test_unprefixed_path_passes_through() {
    let app = app(valid_env());
    let response = get(&app, "/.well-known/openid-configuration").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_jwks_publishes_public_parameters_only() {
    let app = app(valid_env());
    let response = get(&app, "/api/oidc/jwks").await;
    assert_eq!(response.status(), StatusCode::OK);

    let jwks = body_json(response).await;
    let key = &jwks["keys"][0];
    assert_eq!(key["kid"], "test-key-1");
    assert_eq!(key["kty"], "RSA");
    assert!(key.get("n").is_some());
    for private in ["d", "p", "q", "dp", "dq", "qi"] {
        assert!(key.get(private).is_none(), "{private} must not be published");
    }
}

#[tokio::test]
async fn test_landing_response() {
    let app = app(valid_env());
    for uri in ["/api/oidc", "/api/oidc/", "/api/oidc?x=1"] {
        let response = get(&app, uri).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        let text = body_text(response).await;
        assert!(text.contains("/api/oidc/.well-known/openid-configuration"));
        assert!(text.contains("/api/oidc/jwks"));
    }

    // Non-read methods on the root reach the engine.
    let response = send(
        &app,
        Request::post("/api/oidc").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_authorization_code_flow() {
    let app = app(valid_env());

    // 1. Authorization request through the /authorize alias.
    let authorize = format!(
        "/api/oidc/authorize?client_id={CLIENT_ID}&redirect_uri={}&response_type=code\
         &scope=openid%20email%20profile&state=xyz&nonce=n-1\
         &code_challenge={CHALLENGE}&code_challenge_method=S256",
        url::form_urlencoded::byte_serialize(REDIRECT_URI.as_bytes()).collect::<String>()
    );
    let response = get(&app, &authorize).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
    assert!(location.starts_with(&format!("{ISSUER}/interaction/")));
    let cookie = response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("_interaction="));

    // 2. Login page, bound to the interaction cookie.
    let interaction_path = public_path(&location);
    let response = send(
        &app,
        Request::get(interaction_path.as_str())
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains(&format!("{location}/login")));

    // Without the cookie the interaction is refused.
    let response = get(&app, &interaction_path).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // 3. Submit any login.
    let response = send(
        &app,
        Request::post(format!("{interaction_path}/login"))
            .header(header::COOKIE, &cookie)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("login=alice"))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let callback = response.headers()[header::LOCATION].to_str().unwrap().to_string();
    assert!(callback.starts_with(REDIRECT_URI));
    assert_eq!(query_param(&callback, "state").as_deref(), Some("xyz"));
    assert_eq!(query_param(&callback, "iss").as_deref(), Some(ISSUER));
    let code = query_param(&callback, "code").unwrap();

    // 4. Redeem the code.
    let token_request = |code: &str, verifier: &str| {
        client_post(
            "/api/oidc/token",
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", REDIRECT_URI),
                ("code_verifier", verifier),
            ],
            CLIENT_SECRET,
        )
    };
    let response = send(&app, token_request(code.as_str(), VERIFIER)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
    assert_eq!(response.headers()[header::PRAGMA], "no-cache");
    let tokens = body_json(response).await;
    assert_eq!(tokens["token_type"], "Bearer");
    assert_eq!(tokens["expires_in"], 3600);
    let access_token = tokens["access_token"].as_str().unwrap().to_string();
    let refresh_token = tokens["refresh_token"].as_str().unwrap().to_string();
    let id_token = tokens["id_token"].as_str().unwrap().to_string();

    // Codes are single use.
    let response = send(&app, token_request(code.as_str(), VERIFIER)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_grant");

    // 5. The ID token verifies against the published key set.
    let jwks = body_json(get(&app, "/api/oidc/jwks").await).await;
    let key = &jwks["keys"][0];
    let decoding_key = DecodingKey::from_rsa_components(
        key["n"].as_str().unwrap(),
        key["e"].as_str().unwrap(),
    )
    .unwrap();
    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[CLIENT_ID]);
    validation.set_issuer(&[ISSUER]);
    let claims = decode::<Value>(&id_token, &decoding_key, &validation)
        .unwrap()
        .claims;
    assert_eq!(claims["sub"], "alice");
    assert_eq!(claims["nonce"], "n-1");
    assert_eq!(claims["email"], "alice@example.com");
    assert_eq!(claims["name"], "Test User");

    // 6. UserInfo.
    let response = send(
        &app,
        Request::get("/api/oidc/me")
            .header(header::AUTHORIZATION, format!("Bearer {access_token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let userinfo = body_json(response).await;
    assert_eq!(userinfo["sub"], "alice");
    assert_eq!(userinfo["email_verified"], true);
    assert_eq!(userinfo["given_name"], "Test");
    assert_eq!(userinfo["family_name"], "User");

    // 7. Introspection.
    let response = send(
        &app,
        client_post(
            "/api/oidc/token/introspection",
            &[("token", access_token.as_str())],
            CLIENT_SECRET,
        ),
    )
    .await;
    let introspection = body_json(response).await;
    assert_eq!(introspection["active"], true);
    assert_eq!(introspection["sub"], "alice");
    assert_eq!(introspection["client_id"], CLIENT_ID);
    assert_eq!(introspection["iss"], ISSUER);
    assert_eq!(introspection["token_type"], "access_token");

    // 8. Refresh rotates the refresh token.
    let refresh = |token: &str| {
        client_post(
            "/api/oidc/token",
            &[("grant_type", "refresh_token"), ("refresh_token", token)],
            CLIENT_SECRET,
        )
    };
    let response = send(&app, refresh(refresh_token.as_str())).await;
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = body_json(response).await;
    assert_ne!(rotated["refresh_token"], refresh_token.as_str());
    assert!(rotated["id_token"].is_string());

    let response = send(&app, refresh(refresh_token.as_str())).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // 9. Revocation always answers 200 and deactivates the token.
    let response = send(
        &app,
        client_post(
            "/api/oidc/token/revocation",
            &[("token", access_token.as_str())],
            CLIENT_SECRET,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        client_post(
            "/api/oidc/token/introspection",
            &[("token", access_token.as_str())],
            CLIENT_SECRET,
        ),
    )
    .await;
    assert_eq!(body_json(response).await, serde_json::json!({ "active": false }));

    let response = send(
        &app,
        Request::get("/api/oidc/me")
            .header(header::AUTHORIZATION, format!("Bearer {access_token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_authorization_errors() {
    let app = app(valid_env());
    let redirect = url::form_urlencoded::byte_serialize(REDIRECT_URI.as_bytes()).collect::<String>();

    // Unregistered redirect URI is rendered in place.
    let response = get(
        &app,
        &format!(
            "/api/oidc/auth?client_id={CLIENT_ID}&redirect_uri=http%3A%2F%2Fevil.example%2Fcb\
             &response_type=code&scope=openid"
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Missing openid scope goes back to the client.
    let response = get(
        &app,
        &format!(
            "/api/oidc/auth?client_id={CLIENT_ID}&redirect_uri={redirect}\
             &response_type=code&scope=email&state=s1"
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
    assert_eq!(query_param(&location, "error").as_deref(), Some("invalid_scope"));
    assert_eq!(query_param(&location, "state").as_deref(), Some("s1"));
}

#[tokio::test]
async fn test_abort_interaction() {
    let app = app(valid_env());
    let redirect = url::form_urlencoded::byte_serialize(REDIRECT_URI.as_bytes()).collect::<String>();
    let response = get(
        &app,
        &format!(
            "/api/oidc/authorize?client_id={CLIENT_ID}&redirect_uri={redirect}\
             &response_type=code&scope=openid&state=s2"
        ),
    )
    .await;
    let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
    let cookie = response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let response = send(
        &app,
        Request::get(format!("{}/abort", public_path(&location)))
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let callback = response.headers()[header::LOCATION].to_str().unwrap().to_string();
    assert_eq!(query_param(&callback, "error").as_deref(), Some("access_denied"));
    assert_eq!(query_param(&callback, "state").as_deref(), Some("s2"));
}

#[tokio::test]
async fn test_trailing_slash_issuer_is_kept_verbatim() {
    let issuer = format!("{ISSUER}/");
    let mut env = valid_env();
    env.insert("ISSUER".to_string(), issuer.clone());
    let app = app(env);

    let response = get(&app, "/api/oidc/.well-known/openid-configuration").await;
    assert_eq!(response.status(), StatusCode::OK);
    let doc = body_json(response).await;
    assert_eq!(doc["issuer"], issuer.as_str());
    assert_eq!(doc["authorization_endpoint"], format!("{ISSUER}/auth"));
    assert_eq!(doc["token_endpoint"], format!("{ISSUER}/token"));
    assert_eq!(doc["jwks_uri"], format!("{ISSUER}/jwks"));

    let redirect = url::form_urlencoded::byte_serialize(REDIRECT_URI.as_bytes()).collect::<String>();
    let response = get(
        &app,
        &format!(
            "/api/oidc/authorize?client_id={CLIENT_ID}&redirect_uri={redirect}\
             &response_type=code&scope=openid&state=s3"
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
    assert!(location.starts_with(&format!("{ISSUER}/interaction/")));
    let cookie = response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let response = send(
        &app,
        Request::get(format!("{}/abort", public_path(&location)))
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let callback = response.headers()[header::LOCATION].to_str().unwrap().to_string();
    assert_eq!(query_param(&callback, "iss").as_deref(), Some(issuer.as_str()));
}

#[tokio::test]
async fn test_client_credentials_and_bad_secret() {
    let app = app(valid_env());

    let response = send(
        &app,
        client_post(
            "/api/oidc/token",
            &[("grant_type", "client_credentials"), ("scope", "api:read")],
            CLIENT_SECRET,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let tokens = body_json(response).await;
    assert!(tokens["access_token"].is_string());
    assert!(tokens.get("id_token").is_none());
    assert!(tokens.get("refresh_token").is_none());
    assert_eq!(tokens["scope"], "api:read");

    let response = send(
        &app,
        client_post(
            "/api/oidc/token/introspection",
            &[("token", tokens["access_token"].as_str().unwrap())],
            CLIENT_SECRET,
        ),
    )
    .await;
    let introspection = body_json(response).await;
    assert_eq!(introspection["active"], true);
    assert_eq!(introspection["sub"], CLIENT_ID);

    let response = send(
        &app,
        client_post(
            "/api/oidc/token",
            &[("grant_type", "client_credentials")],
            "wrong-secret",
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "invalid_client");

    let response = send(
        &app,
        client_post("/api/oidc/token", &[("grant_type", "password")], CLIENT_SECRET),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "unsupported_grant_type");
}

#[tokio::test]
async fn test_missing_setting_is_configuration_error() {
    let mut env = valid_env();
    env.remove("ISSUER");
    let app = app(env);

    for uri in ["/api/oidc/.well-known/openid-configuration", "/api/oidc"] {
        let response = get(&app, uri).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "configuration_error");
        assert!(body["error_description"].as_str().unwrap().contains("ISSUER"));
    }
}

#[tokio::test]
async fn test_error_envelope_never_leaks_secrets() {
    let mut env = valid_env();
    env.insert(
        "SIGNING_JWKS".into(),
        r#"{"keys":[{"kty":"RSA","kid":"k1","d":"super-secret-exponent""#.into(),
    );
    let app = app(env);

    let response = get(&app, "/api/oidc/jwks").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let text = body_text(response).await;
    assert!(text.contains("configuration_error"));
    assert!(text.contains("SIGNING_JWKS"));
    assert!(!text.contains("super-secret-exponent"));
    assert!(!text.contains(COOKIE_SECRET));
    assert!(!text.contains(CLIENT_SECRET));
}

#[tokio::test]
async fn test_ec_only_keys_make_engine_unavailable() {
    let mut env = valid_env();
    env.insert(
        "SIGNING_JWKS".into(),
        r#"{"keys":[{"kty":"EC","kid":"ec-1","crv":"P-256","x":"AA","y":"AA","d":"AA"}]}"#.into(),
    );
    let (manager, attempts) = manager_from(env);
    let app = HttpServer::new(&ServerConfig::default(), manager).router();

    for _ in 0..2 {
        let response = get(&app, "/api/oidc/jwks").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "engine_unavailable");
    }
    // Failures are not cached: each request retried construction.
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_concurrent_cold_requests_build_one_engine() {
    let (manager, attempts) = manager_from(valid_env());
    let app = HttpServer::new(&ServerConfig::default(), manager.clone()).router();

    let requests = (0..12).map(|_| {
        let app = app.clone();
        async move { get(&app, "/api/oidc/.well-known/openid-configuration").await.status() }
    });
    let statuses = futures_util::future::join_all(requests).await;

    assert!(statuses.iter().all(|s| *s == StatusCode::OK));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert!(manager.current().is_some());
}

#[tokio::test]
async fn test_head_on_root_is_landing() {
    let app = app(valid_env());
    let response = send(
        &app,
        Request::builder()
            .method(Method::HEAD)
            .uri("/api/oidc/")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );
}

#[tokio::test]
async fn test_tcp_round_trip() {
    let (manager, _) = manager_from(valid_env());
    let server = HttpServer::new(&ServerConfig::default(), manager);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let handle = tokio::spawn(server.run(listener, shutdown.wait()));

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{addr}/api/oidc/.well-known/openid-configuration"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let doc: Value = response.json().await.unwrap();
    assert_eq!(doc["token_endpoint"], format!("{ISSUER}/token"));

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}
