//! Engine construction from the validated configuration.
//!
//! `engine_settings` is the one place where the typed `ProviderConfig` is
//! translated into the engine's settings; everything the engine needs but
//! the environment does not provide (grant policy, features, lifetimes) is
//! fixed here.

use std::sync::Arc;

use crate::account::resolve_claims;
use crate::config::{self, ProviderConfig};
use crate::lifecycle::manager::{EngineError, EngineManager};
use crate::provider::{
    ClientMetadata, Engine, Features, GrantType, ProviderSettings, TokenTtl,
};

/// Fixed grant policy for the registered client.
pub const CLIENT_GRANT_TYPES: &[GrantType] = &[
    GrantType::AuthorizationCode,
    GrantType::RefreshToken,
    GrantType::ClientCredentials,
];

/// Total translation of the configuration into engine settings.
pub fn engine_settings(config: &ProviderConfig) -> ProviderSettings {
    let client = ClientMetadata {
        client_id: config.client_id.clone(),
        client_secret: config.client_secret.clone(),
        redirect_uris: config.redirect_uris.clone(),
        grant_types: CLIENT_GRANT_TYPES.to_vec(),
        response_types: vec!["code".to_string()],
        token_endpoint_auth_method: "client_secret_basic".to_string(),
    };

    ProviderSettings {
        issuer: config.issuer.clone(),
        clients: vec![client],
        jwks: config.signing_keys.clone(),
        cookie_keys: config.cookie_keys.clone(),
        find_account: Arc::new(resolve_claims),
        features: Features {
            dev_interactions: true,
            introspection: true,
            revocation: true,
        },
        ttl: TokenTtl::default(),
    }
}

/// Builds the engine and runs its readiness step.
pub async fn build_engine_from(config: ProviderConfig) -> Result<Engine, EngineError> {
    let engine = Engine::new(engine_settings(&config))?;
    engine.initialize().await?;
    Ok(engine)
}

/// Loads the configuration from the environment and builds the engine.
pub async fn build_engine() -> Result<Engine, EngineError> {
    let config = config::load()?;
    build_engine_from(config).await
}

/// Manager that builds the engine from the process environment on first use.
pub fn engine_manager() -> EngineManager<Engine> {
    EngineManager::new(build_engine)
}
