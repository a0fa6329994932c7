//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check URL schemes for the issuer and every redirect URI
//! - Require non-empty secret collections
//! - Check structural completeness of every signing key
//!
//! # Design Decisions
//! - Validation is a set of pure functions over already-parsed values
//! - Stops at the first violation; the error names the setting
//! - Error details never quote secret values

use std::collections::{BTreeMap, HashSet};

use url::Url;

use crate::config::loader::ConfigError;
use crate::config::schema::{KeyType, RawKeySet, SigningKey};

/// Requires `value` to be an absolute `http` or `https` URL with a host.
pub fn validate_http_url(name: &'static str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::InvalidValue {
        name,
        detail: format!("'{value}' is not an absolute URL: {e}"),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue {
            name,
            detail: format!("'{value}' must start with http:// or https://"),
        });
    }
    if !url.has_host() {
        return Err(ConfigError::InvalidValue {
            name,
            detail: format!("'{value}' has no host"),
        });
    }
    Ok(())
}

/// Requires at least one cookie secret and no empty ones.
pub fn validate_cookie_keys(name: &'static str, keys: &[String]) -> Result<(), ConfigError> {
    if keys.is_empty() {
        return Err(ConfigError::InvalidValue {
            name,
            detail: "must be a JSON array with at least one secret".into(),
        });
    }
    if let Some(idx) = keys.iter().position(|k| k.is_empty()) {
        return Err(ConfigError::InvalidValue {
            name,
            detail: format!("secret {idx} is empty"),
        });
    }
    Ok(())
}

/// Checks every key for `kty`, `kid` and (asymmetric types) the private
/// component `d`, and converts the set into validated [`SigningKey`]s.
pub fn validate_signing_keys(
    name: &'static str,
    set: RawKeySet,
) -> Result<Vec<SigningKey>, ConfigError> {
    if set.keys.is_empty() {
        return Err(ConfigError::InvalidValue {
            name,
            detail: "must contain at least one key".into(),
        });
    }

    let mut seen = HashSet::new();
    let mut keys = Vec::with_capacity(set.keys.len());

    for (idx, raw) in set.keys.into_iter().enumerate() {
        let (Some(kty), Some(kid)) = (
            raw.kty.filter(|s| !s.is_empty()),
            raw.kid.filter(|s| !s.is_empty()),
        ) else {
            return Err(ConfigError::InvalidValue {
                name,
                detail: format!("key {idx} missing required fields (kty, kid)"),
            });
        };

        let key_type = KeyType::from_kty(&kty).ok_or_else(|| ConfigError::InvalidValue {
            name,
            detail: format!("key {idx} has unsupported kty '{kty}' (expected RSA, EC or OKP)"),
        })?;

        let params: BTreeMap<String, String> = raw
            .params
            .into_iter()
            .filter_map(|(k, v)| match v {
                serde_json::Value::String(s) => Some((k, s)),
                _ => None,
            })
            .collect();

        if params.get("d").map_or(true, |d| d.is_empty()) {
            return Err(ConfigError::InvalidValue {
                name,
                detail: format!("key {idx} is missing private key component (d)"),
            });
        }

        if !seen.insert(kid.clone()) {
            return Err(ConfigError::InvalidValue {
                name,
                detail: format!("key {idx} reuses kid '{kid}'"),
            });
        }

        keys.push(SigningKey::new(kid, key_type, raw.alg, params));
    }

    Ok(keys)
}
