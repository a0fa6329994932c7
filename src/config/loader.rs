//! Configuration loading from the process environment.

use std::collections::HashSet;

use crate::config::schema::{ProviderConfig, RawKeySet, ServerConfig};
use crate::config::validation::{validate_cookie_keys, validate_http_url, validate_signing_keys};

pub const ISSUER: &str = "ISSUER";
pub const CLIENT_ID: &str = "CLIENT_ID";
pub const CLIENT_SECRET: &str = "CLIENT_SECRET";
pub const REDIRECT_URIS: &str = "REDIRECT_URIS";
pub const COOKIE_KEYS: &str = "COOKIE_KEYS";
pub const SIGNING_JWKS: &str = "SIGNING_JWKS";

const DEFAULT_CLIENT_SECRET: &str = "dev-secret";
const DEFAULT_REDIRECT_URIS: &str = "http://localhost:3000/callback";

/// Error type for configuration loading.
///
/// Messages name the offending setting but never quote secret values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting {name}")]
    MissingSetting { name: &'static str },

    #[error("{name} is malformed: {cause}")]
    MalformedValue { name: &'static str, cause: String },

    #[error("{name} is invalid: {detail}")]
    InvalidValue { name: &'static str, detail: String },
}

impl ConfigError {
    /// Name of the setting this error is about.
    pub fn setting(&self) -> &'static str {
        match self {
            ConfigError::MissingSetting { name }
            | ConfigError::MalformedValue { name, .. }
            | ConfigError::InvalidValue { name, .. } => name,
        }
    }
}

/// Load and validate the provider configuration from the process environment.
pub fn load() -> Result<ProviderConfig, ConfigError> {
    load_from(|name| std::env::var(name).ok())
}

/// Load and validate the provider configuration from an arbitrary lookup.
///
/// An empty value counts as absent.
pub fn load_from<F>(lookup: F) -> Result<ProviderConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.is_empty());
    let require = |name: &'static str| get(name).ok_or(ConfigError::MissingSetting { name });

    let issuer = require(ISSUER)?;
    validate_http_url(ISSUER, &issuer)?;

    let client_id = require(CLIENT_ID)?;
    let client_secret = get(CLIENT_SECRET).unwrap_or_else(|| DEFAULT_CLIENT_SECRET.to_string());

    let redirect_uris = parse_redirect_uris(
        &get(REDIRECT_URIS).unwrap_or_else(|| DEFAULT_REDIRECT_URIS.to_string()),
    );
    if redirect_uris.is_empty() {
        return Err(ConfigError::InvalidValue {
            name: REDIRECT_URIS,
            detail: "must list at least one URI".into(),
        });
    }
    for uri in &redirect_uris {
        validate_http_url(REDIRECT_URIS, uri)?;
    }

    let cookie_keys: Vec<String> = parse_json(COOKIE_KEYS, &require(COOKIE_KEYS)?)?;
    validate_cookie_keys(COOKIE_KEYS, &cookie_keys)?;

    let key_set: RawKeySet = parse_json(SIGNING_JWKS, &require(SIGNING_JWKS)?)?;
    let signing_keys = validate_signing_keys(SIGNING_JWKS, key_set)?;

    tracing::info!(
        issuer = %issuer,
        client_id = %client_id,
        redirect_uris = redirect_uris.len(),
        cookie_keys = cookie_keys.len(),
        signing_keys = signing_keys.len(),
        "Configuration loaded"
    );

    Ok(ProviderConfig {
        issuer,
        client_id,
        client_secret,
        redirect_uris,
        cookie_keys,
        signing_keys,
    })
}

/// Load listener-side settings, falling back to defaults.
pub fn load_server() -> Result<ServerConfig, ConfigError> {
    load_server_from(|name| std::env::var(name).ok())
}

pub fn load_server_from<F>(lookup: F) -> Result<ServerConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.is_empty());
    let mut config = ServerConfig::default();

    if let Some(addr) = get("BIND_ADDRESS") {
        config.bind_address = addr;
    }
    if let Some(secs) = get("REQUEST_TIMEOUT_SECS") {
        config.request_timeout_secs = secs.parse().map_err(|_| ConfigError::InvalidValue {
            name: "REQUEST_TIMEOUT_SECS",
            detail: format!("'{secs}' is not a number of seconds"),
        })?;
    }
    config.metrics_address = get("METRICS_ADDRESS");

    Ok(config)
}

/// Comma-separated list; entries trimmed, blanks and duplicates dropped.
fn parse_redirect_uris(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(*s))
        .map(String::from)
        .collect()
}

/// Parses structured text. The cause reports position and category only so
/// secret input never ends up in an error message.
fn parse_json<T: serde::de::DeserializeOwned>(
    name: &'static str,
    raw: &str,
) -> Result<T, ConfigError> {
    serde_json::from_str(raw).map_err(|e| {
        let category = match e.classify() {
            serde_json::error::Category::Syntax | serde_json::error::Category::Eof => {
                "not valid JSON"
            }
            serde_json::error::Category::Data => "unexpected JSON shape",
            serde_json::error::Category::Io => "unreadable input",
        };
        ConfigError::MalformedValue {
            name,
            cause: format!("{category} at line {} column {}", e.line(), e.column()),
        }
    })
}
