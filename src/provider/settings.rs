//! Configuration shape accepted by the engine.

use std::fmt;
use std::sync::Arc;

use crate::account::Claims;
use crate::config::SigningKey;

/// Resolves a subject identifier into its claims bundle.
pub type FindAccount = Arc<dyn Fn(&str) -> Claims + Send + Sync>;

/// OAuth grant types the engine implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantType {
    AuthorizationCode,
    RefreshToken,
    ClientCredentials,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantType::AuthorizationCode => "authorization_code",
            GrantType::RefreshToken => "refresh_token",
            GrantType::ClientCredentials => "client_credentials",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "authorization_code" => Some(GrantType::AuthorizationCode),
            "refresh_token" => Some(GrantType::RefreshToken),
            "client_credentials" => Some(GrantType::ClientCredentials),
            _ => None,
        }
    }
}

/// A statically registered client.
#[derive(Clone)]
pub struct ClientMetadata {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uris: Vec<String>,
    pub grant_types: Vec<GrantType>,
    pub response_types: Vec<String>,
    pub token_endpoint_auth_method: String,
}

impl ClientMetadata {
    pub fn allows_grant(&self, grant: GrantType) -> bool {
        self.grant_types.contains(&grant)
    }
}

impl fmt::Debug for ClientMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientMetadata")
            .field("client_id", &self.client_id)
            .field("redirect_uris", &self.redirect_uris)
            .field("grant_types", &self.grant_types)
            .field("response_types", &self.response_types)
            .field("token_endpoint_auth_method", &self.token_endpoint_auth_method)
            .finish_non_exhaustive()
    }
}

/// Optional engine capabilities.
#[derive(Debug, Clone, Copy, Default)]
pub struct Features {
    /// Built-in login pages that accept any subject identifier.
    pub dev_interactions: bool,
    pub introspection: bool,
    pub revocation: bool,
}

/// Lifetimes in seconds per token class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTtl {
    pub access_token: u64,
    pub authorization_code: u64,
    pub id_token: u64,
    pub refresh_token: u64,
    pub interaction: u64,
}

impl Default for TokenTtl {
    fn default() -> Self {
        Self {
            access_token: 3600,
            authorization_code: 600,
            id_token: 3600,
            refresh_token: 14 * 24 * 3600,
            interaction: 3600,
        }
    }
}

/// Everything the engine needs to start.
#[derive(Clone)]
pub struct ProviderSettings {
    pub issuer: String,
    pub clients: Vec<ClientMetadata>,
    pub jwks: Vec<SigningKey>,
    pub cookie_keys: Vec<String>,
    pub find_account: FindAccount,
    pub features: Features,
    pub ttl: TokenTtl,
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("issuer", &self.issuer)
            .field("clients", &self.clients)
            .field("jwks", &self.jwks)
            .field("cookie_keys", &self.cookie_keys.len())
            .field("features", &self.features)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
