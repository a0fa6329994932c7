use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Seconds since the Unix epoch.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Random opaque handle for codes, tokens and interaction ids.
pub fn random_handle(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// PKCE parameters captured at the authorization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceChallenge {
    pub challenge: String,
    pub method: String,
}

/// A pending authorization request waiting for the login step.
#[derive(Debug, Clone)]
pub struct Interaction {
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub state: Option<String>,
    pub nonce: Option<String>,
    pub pkce: Option<PkceChallenge>,
    pub expires_at: u64,
}

/// An issued, not yet redeemed authorization code.
#[derive(Debug, Clone)]
pub struct AuthorizationCode {
    pub sub: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub nonce: Option<String>,
    pub pkce: Option<PkceChallenge>,
    pub auth_time: u64,
    pub expires_at: u64,
}

/// Which kind of opaque token a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access_token",
            TokenKind::Refresh => "refresh_token",
        }
    }
}

/// An issued opaque access or refresh token.
#[derive(Debug, Clone)]
pub struct TokenRecord {
    pub kind: TokenKind,
    /// Account subject; `None` for client credentials tokens.
    pub sub: Option<String>,
    pub client_id: String,
    pub scope: String,
    pub auth_time: u64,
    pub issued_at: u64,
    pub expires_at: u64,
}

impl TokenRecord {
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }
}

/// In-memory grant state. Lives as long as the engine instance.
#[derive(Default)]
pub struct GrantStore {
    interactions: DashMap<String, Interaction>,
    codes: DashMap<String, AuthorizationCode>,
    tokens: DashMap<String, TokenRecord>,
}

impl GrantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_interaction(&self, interaction: Interaction) -> String {
        let uid = random_handle(24);
        self.interactions.insert(uid.clone(), interaction);
        uid
    }

    /// Returns the interaction if it exists and has not expired.
    pub fn interaction(&self, uid: &str) -> Option<Interaction> {
        let now = now_secs();
        let found = self.interactions.get(uid).map(|e| e.value().clone())?;
        if now >= found.expires_at {
            self.interactions.remove(uid);
            return None;
        }
        Some(found)
    }

    pub fn finish_interaction(&self, uid: &str) -> Option<Interaction> {
        let now = now_secs();
        self.interactions
            .remove(uid)
            .map(|(_, i)| i)
            .filter(|i| now < i.expires_at)
    }

    pub fn insert_code(&self, code: AuthorizationCode) -> String {
        let handle = random_handle(43);
        self.codes.insert(handle.clone(), code);
        handle
    }

    /// Codes are single use: the record is removed whether or not it expired.
    pub fn take_code(&self, handle: &str) -> Option<AuthorizationCode> {
        let now = now_secs();
        self.codes
            .remove(handle)
            .map(|(_, c)| c)
            .filter(|c| now < c.expires_at)
    }

    pub fn insert_token(&self, record: TokenRecord) -> String {
        let handle = random_handle(43);
        self.tokens.insert(handle.clone(), record);
        handle
    }

    /// Returns a live token; expired records are dropped on sight.
    pub fn token(&self, handle: &str) -> Option<TokenRecord> {
        let now = now_secs();
        let record = self.tokens.get(handle).map(|e| e.value().clone())?;
        if record.is_expired(now) {
            self.tokens.remove(handle);
            return None;
        }
        Some(record)
    }

    pub fn revoke_token(&self, handle: &str) -> Option<TokenRecord> {
        self.tokens.remove(handle).map(|(_, r)| r)
    }

    /// Drops expired entries of every kind.
    pub fn purge_expired(&self) {
        let now = now_secs();
        self.interactions.retain(|_, i| now < i.expires_at);
        self.codes.retain(|_, c| now < c.expires_at);
        self.tokens.retain(|_, t| !t.is_expired(now));
    }
}
