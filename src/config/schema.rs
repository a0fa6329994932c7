//! Configuration schema definitions.
//!
//! `ProviderConfig` is the validated, immutable record the engine is built
//! from. `ServerConfig` holds the listener-side settings that never reach
//! the engine.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

/// JWK parameters that carry private key material.
const PRIVATE_PARAMS: &[&str] = &["d", "p", "q", "dp", "dq", "qi", "k"];

/// Validated provider configuration.
///
/// Built once per process by [`crate::config::loader::load`] and never
/// mutated afterwards.
#[derive(Clone)]
pub struct ProviderConfig {
    /// Absolute `http(s)` URL identifying this provider, including its mount path.
    pub issuer: String,

    /// The single registered client.
    pub client_id: String,

    /// Client secret used for `client_secret_basic` authentication.
    pub client_secret: String,

    /// Allowed redirect URIs, in configuration order, without duplicates.
    pub redirect_uris: Vec<String>,

    /// Cookie-signing secrets. The first one signs, all of them verify.
    pub cookie_keys: Vec<String>,

    /// Private signing keys, in configuration order.
    pub signing_keys: Vec<SigningKey>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("issuer", &self.issuer)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***REDACTED***")
            .field("redirect_uris", &self.redirect_uris)
            .field("cookie_keys", &format_args!("[{} redacted]", self.cookie_keys.len()))
            .field("signing_keys", &self.signing_keys)
            .finish()
    }
}

/// Asymmetric JWK key families accepted for signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Rsa,
    Ec,
    Okp,
}

impl KeyType {
    /// Parses the JWK `kty` value. Symmetric and unknown types yield `None`.
    pub fn from_kty(kty: &str) -> Option<Self> {
        match kty {
            "RSA" => Some(KeyType::Rsa),
            "EC" => Some(KeyType::Ec),
            "OKP" => Some(KeyType::Okp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Rsa => "RSA",
            KeyType::Ec => "EC",
            KeyType::Okp => "OKP",
        }
    }
}

/// A validated private signing key.
#[derive(Clone)]
pub struct SigningKey {
    pub kid: String,
    pub kty: KeyType,
    pub alg: Option<String>,
    params: BTreeMap<String, String>,
}

impl SigningKey {
    pub(crate) fn new(
        kid: String,
        kty: KeyType,
        alg: Option<String>,
        params: BTreeMap<String, String>,
    ) -> Self {
        Self { kid, kty, alg, params }
    }

    /// Looks up a key parameter (`n`, `e`, `d`, `crv`, ...).
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let public: Vec<&str> = self
            .params
            .keys()
            .map(String::as_str)
            .filter(|name| !PRIVATE_PARAMS.contains(name))
            .collect();
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("kty", &self.kty)
            .field("alg", &self.alg)
            .field("public_params", &public)
            .finish_non_exhaustive()
    }
}

/// `SIGNING_JWKS` as it appears in the environment, before validation.
#[derive(Debug, Deserialize)]
pub(crate) struct RawKeySet {
    pub keys: Vec<RawKey>,
}

/// One JWK entry before validation. Unknown members are kept as strings;
/// non-string members (e.g. `key_ops`) are ignored.
#[derive(Deserialize)]
pub(crate) struct RawKey {
    pub kty: Option<String>,
    pub kid: Option<String>,
    pub alg: Option<String>,
    #[serde(flatten)]
    pub params: BTreeMap<String, serde_json::Value>,
}

impl fmt::Debug for RawKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawKey")
            .field("kty", &self.kty)
            .field("kid", &self.kid)
            .finish_non_exhaustive()
    }
}

/// Listener-side settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Total request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Prometheus exporter address; metrics are not exported when unset.
    pub metrics_address: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            request_timeout_secs: 30,
            metrics_address: None,
        }
    }
}
