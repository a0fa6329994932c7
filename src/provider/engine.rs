use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::provider::client::ClientRegistry;
use crate::provider::cookies::CookieSigner;
use crate::provider::error::{BuildError, ProtocolError};
use crate::provider::handlers;
use crate::provider::keys::{KeyStore, SIGNING_ALG};
use crate::provider::settings::{Features, FindAccount, GrantType, ProviderSettings, TokenTtl};
use crate::provider::store::GrantStore;
use crate::provider::token::TokenService;

/// How often expired grants are swept from memory.
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Documents computed once by the readiness step.
pub(crate) struct Documents {
    pub discovery: Value,
    pub jwks: Value,
}

/// Internal shared state for engine handlers.
pub(crate) struct EngineState {
    /// Issuer exactly as configured.
    pub issuer: String,
    pub clients: ClientRegistry,
    pub keys: Arc<KeyStore>,
    pub tokens: TokenService,
    pub grants: GrantStore,
    pub cookies: CookieSigner,
    pub find_account: FindAccount,
    pub features: Features,
    pub ttl: TokenTtl,
    pub documents: OnceLock<Documents>,
}

impl EngineState {
    /// Absolute public URL of an engine route.
    pub fn url(&self, route: &str) -> String {
        format!("{}{route}", self.issuer.trim_end_matches('/'))
    }

    /// Cookie path covering the issuer's mount point.
    pub fn cookie_path(&self) -> String {
        url::Url::parse(&self.issuer)
            .map(|u| u.path().trim_end_matches('/').to_string())
            .ok()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "/".to_string())
    }

    fn build_documents(&self) -> Documents {
        let mut discovery = json!({
            "issuer": self.issuer,
            "authorization_endpoint": self.url("/auth"),
            "token_endpoint": self.url("/token"),
            "userinfo_endpoint": self.url("/me"),
            "jwks_uri": self.url("/jwks"),
            "response_types_supported": ["code"],
            "response_modes_supported": ["query"],
            "grant_types_supported": [
                GrantType::AuthorizationCode.as_str(),
                GrantType::RefreshToken.as_str(),
                GrantType::ClientCredentials.as_str(),
            ],
            "subject_types_supported": ["public"],
            "id_token_signing_alg_values_supported": [SIGNING_ALG],
            "token_endpoint_auth_methods_supported": ["client_secret_basic"],
            "scopes_supported": ["openid", "email", "profile", "offline_access"],
            "claims_supported": [
                "sub", "email", "email_verified", "name", "given_name", "family_name",
                "iss", "aud", "exp", "iat", "auth_time", "nonce",
            ],
            "code_challenge_methods_supported": ["S256", "plain"],
            "claims_parameter_supported": false,
            "request_parameter_supported": false,
            "authorization_response_iss_parameter_supported": true,
        });

        if let Value::Object(map) = &mut discovery {
            if self.features.introspection {
                map.insert("introspection_endpoint".into(), json!(self.url("/token/introspection")));
                map.insert(
                    "introspection_endpoint_auth_methods_supported".into(),
                    json!(["client_secret_basic"]),
                );
            }
            if self.features.revocation {
                map.insert("revocation_endpoint".into(), json!(self.url("/token/revocation")));
                map.insert(
                    "revocation_endpoint_auth_methods_supported".into(),
                    json!(["client_secret_basic"]),
                );
            }
        }

        Documents {
            discovery,
            jwks: serde_json::to_value(self.keys.jwks()).unwrap_or_else(|_| json!({ "keys": [] })),
        }
    }
}

/// The OpenID Connect protocol engine.
///
/// Owns the root of its path space: `/auth`, `/token`, `/me`, `/jwks`,
/// `/token/introspection`, `/token/revocation`, `/interaction/{uid}` and
/// `/.well-known/openid-configuration`. Requests are rejected with
/// `server_error` until [`Engine::initialize`] has completed.
pub struct Engine {
    state: Arc<EngineState>,
    router: Router,
}

impl Engine {
    /// Build the engine from its settings. Parses signing keys; does not
    /// yet accept requests.
    pub fn new(settings: ProviderSettings) -> Result<Self, BuildError> {
        if settings.clients.is_empty() {
            return Err(BuildError::NoClient);
        }
        let keys = Arc::new(KeyStore::from_keys(&settings.jwks)?);
        let state = Arc::new(EngineState {
            tokens: TokenService::new(keys.clone(), settings.issuer.clone(), settings.ttl.id_token),
            issuer: settings.issuer,
            clients: ClientRegistry::new(settings.clients),
            keys,
            grants: GrantStore::new(),
            cookies: CookieSigner::new(settings.cookie_keys),
            find_account: settings.find_account,
            features: settings.features,
            ttl: settings.ttl,
            documents: OnceLock::new(),
        });

        let router = routes(state.clone());
        Ok(Self { state, router })
    }

    /// Readiness step: proves every signing key round-trips, publishes the
    /// discovery and key documents, and starts the expiry sweeper.
    pub async fn initialize(&self) -> Result<(), BuildError> {
        if self.is_ready() {
            return Ok(());
        }

        // RSA signing is CPU-bound; keep it off the async workers.
        let state = self.state.clone();
        tokio::task::spawn_blocking(move || state.tokens.self_check())
            .await
            .map_err(|e| BuildError::Readiness(format!("readiness task failed: {e}")))?
            .map_err(BuildError::Readiness)?;

        if self.state.documents.set(self.state.build_documents()).is_ok() {
            spawn_purge_task(Arc::downgrade(&self.state));
        }

        tracing::info!(
            issuer = %self.state.issuer,
            signing_keys = self.state.keys.iter().count(),
            "OIDC engine ready"
        );
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.state.documents.get().is_some()
    }

    pub fn issuer(&self) -> &str {
        &self.state.issuer
    }

    /// Dispatch one request to the engine's native routes.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        if !self.is_ready() {
            return ProtocolError::Internal("engine has not been initialized".into())
                .into_response();
        }
        match self.router.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }
}

/// Build the engine's router.
fn routes(state: Arc<EngineState>) -> Router {
    let features = state.features;

    let mut router = Router::new()
        .route(
            "/.well-known/openid-configuration",
            get(handlers::metadata::discovery_handler),
        )
        .route("/jwks", get(handlers::metadata::jwks_handler))
        .route("/auth", get(handlers::interaction::authorization_handler))
        .route("/token", post(handlers::grant::token_handler))
        .route(
            "/me",
            get(handlers::resource::userinfo_handler).post(handlers::resource::userinfo_handler),
        );

    if features.dev_interactions {
        router = router
            .route("/interaction/{uid}", get(handlers::interaction::login_page_handler))
            .route(
                "/interaction/{uid}/login",
                post(handlers::interaction::login_submit_handler),
            )
            .route(
                "/interaction/{uid}/abort",
                get(handlers::interaction::abort_handler).post(handlers::interaction::abort_handler),
            );
    }
    if features.introspection {
        router = router.route(
            "/token/introspection",
            post(handlers::resource::introspection_handler),
        );
    }
    if features.revocation {
        router = router.route(
            "/token/revocation",
            post(handlers::resource::revocation_handler),
        );
    }

    router
        .fallback(handlers::not_found_handler)
        .with_state(state)
}

fn spawn_purge_task(state: Weak<EngineState>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            let Some(state) = state.upgrade() else {
                break;
            };
            state.grants.purge_expired();
        }
    });
}
