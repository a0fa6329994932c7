use std::sync::Arc;

use jsonwebtoken::{decode, encode, Algorithm, Header, Validation};
use serde_json::{json, Value};

use crate::provider::error::ProtocolError;
use crate::provider::keys::KeyStore;
use crate::provider::store::now_secs;

/// Inputs for one ID token.
pub struct IdTokenRequest<'a> {
    pub audience: &'a str,
    pub auth_time: u64,
    pub nonce: Option<&'a str>,
    /// Scope-filtered claims; must contain `sub`.
    pub claims: serde_json::Map<String, Value>,
}

/// Signs ID tokens with the primary key.
pub struct TokenService {
    keys: Arc<KeyStore>,
    issuer: String,
    id_token_ttl: u64,
}

impl TokenService {
    pub fn new(keys: Arc<KeyStore>, issuer: String, id_token_ttl: u64) -> Self {
        Self {
            keys,
            issuer,
            id_token_ttl,
        }
    }

    pub fn issue_id_token(&self, req: IdTokenRequest<'_>) -> Result<String, ProtocolError> {
        let now = now_secs();
        let mut claims = json!({
            "iss": self.issuer,
            "aud": req.audience,
            "iat": now,
            "exp": now + self.id_token_ttl,
            "auth_time": req.auth_time,
        });

        if let Value::Object(map) = &mut claims {
            if let Some(nonce) = req.nonce {
                map.insert("nonce".into(), Value::String(nonce.to_string()));
            }
            // Registered claims above win over account claims.
            for (k, v) in req.claims {
                map.entry(k).or_insert(v);
            }
        }

        self.sign(&claims)
    }

    fn sign(&self, claims: &Value) -> Result<String, ProtocolError> {
        let key = self.keys.primary();
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(key.kid().to_string());

        encode(&header, claims, key.encoding_key())
            .map_err(|e| ProtocolError::Internal(format!("failed to sign JWT: {e}")))
    }

    /// Signs a throwaway token with every key and verifies it again.
    pub fn self_check(&self) -> Result<(), String> {
        let now = now_secs();
        for key in self.keys.iter() {
            let mut header = Header::new(Algorithm::RS256);
            header.kid = Some(key.kid().to_string());
            let probe = json!({ "iss": self.issuer, "aud": "readiness", "iat": now, "exp": now + 60 });

            let token = encode(&header, &probe, key.encoding_key())
                .map_err(|e| format!("key '{}' cannot sign: {e}", key.kid()))?;

            let mut validation = Validation::new(Algorithm::RS256);
            validation.set_audience(&["readiness"]);
            validation.set_issuer(&[&self.issuer]);
            decode::<Value>(&token, key.decoding_key(), &validation)
                .map_err(|e| format!("key '{}' cannot verify its own signature: {e}", key.kid()))?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn verify(&self, token: &str, audience: &str) -> Result<Value, ProtocolError> {
        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| ProtocolError::InvalidToken(format!("malformed token: {e}")))?;
        let key = header
            .kid
            .as_deref()
            .and_then(|kid| self.keys.find(kid))
            .ok_or_else(|| ProtocolError::InvalidToken("unknown signing key".into()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[audience]);
        validation.set_issuer(&[&self.issuer]);
        decode::<Value>(token, key.decoding_key(), &validation)
            .map(|data| data.claims)
            .map_err(|e| ProtocolError::InvalidToken(format!("invalid token: {e}")))
    }
}
