//! Signed interaction cookies.
//!
//! The cookie value is `<uid>.<sig>` where `sig` is the base64url
//! HMAC-SHA256 of the uid. The first cookie secret signs; any configured
//! secret verifies, so secrets can be rotated by prepending a new one.

use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const INTERACTION_COOKIE: &str = "_interaction";

pub struct CookieSigner {
    keys: Vec<String>,
}

impl CookieSigner {
    pub fn new(keys: Vec<String>) -> Self {
        Self { keys }
    }

    fn mac(key: &str, value: &str) -> Option<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(key.as_bytes()).ok()?;
        mac.update(value.as_bytes());
        Some(mac)
    }

    /// Signs `value` with the primary secret.
    pub fn sign(&self, value: &str) -> Option<String> {
        let key = self.keys.first()?;
        let sig = Self::mac(key, value)?.finalize().into_bytes();
        Some(format!("{value}.{}", URL_SAFE_NO_PAD.encode(sig)))
    }

    /// Returns the signed value if any secret verifies it.
    pub fn verify<'a>(&self, signed: &'a str) -> Option<&'a str> {
        let (value, sig) = signed.rsplit_once('.')?;
        let sig = URL_SAFE_NO_PAD.decode(sig).ok()?;
        self.keys
            .iter()
            .filter_map(|key| Self::mac(key, value))
            .any(|mac| mac.verify_slice(&sig).is_ok())
            .then_some(value)
    }

    /// `Set-Cookie` value for a fresh interaction.
    pub fn interaction_cookie(&self, uid: &str, path: &str, max_age: u64) -> Option<String> {
        let signed = self.sign(uid)?;
        Some(format!(
            "{INTERACTION_COOKIE}={signed}; Path={path}; Max-Age={max_age}; HttpOnly; SameSite=Lax"
        ))
    }

    /// `Set-Cookie` value that clears the interaction cookie.
    pub fn clear_interaction_cookie(path: &str) -> String {
        format!("{INTERACTION_COOKIE}=; Path={path}; Max-Age=0; HttpOnly; SameSite=Lax")
    }

    /// Verified interaction uid from the request's `Cookie` headers.
    pub fn interaction_uid(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .filter(|(name, _)| *name == INTERACTION_COOKIE)
            .find_map(|(_, value)| self.verify(value).map(String::from))
    }
}
