use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{DecodingKey, EncodingKey};
use rsa::pkcs8::EncodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey};
use serde::Serialize;

use crate::config::{KeyType, SigningKey};
use crate::provider::error::BuildError;

pub const SIGNING_ALG: &str = "RS256";

/// RSA key material for JWT signing and JWKS publication.
pub struct SigningMaterial {
    kid: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    /// Base64url-encoded RSA modulus (for JWKS).
    n: String,
    /// Base64url-encoded RSA public exponent (for JWKS).
    e: String,
}

impl SigningMaterial {
    /// Rebuild an RSA private key from its JWK parameters.
    pub fn from_rsa_jwk(key: &SigningKey) -> Result<Self, BuildError> {
        let fail = |reason: String| BuildError::SigningKey {
            kid: key.kid.clone(),
            reason,
        };

        if let Some(alg) = key.alg.as_deref() {
            if alg != SIGNING_ALG {
                return Err(fail(format!("unsupported alg '{alg}'")));
            }
        }

        let n = jwk_uint(key, "n")?;
        let e = jwk_uint(key, "e")?;
        let d = jwk_uint(key, "d")?;
        let primes = match (key.param("p"), key.param("q")) {
            (Some(_), Some(_)) => vec![jwk_uint(key, "p")?, jwk_uint(key, "q")?],
            _ => Vec::new(),
        };

        let private_key = RsaPrivateKey::from_components(n, e, d, primes)
            .map_err(|err| fail(format!("invalid RSA components: {err}")))?;
        private_key
            .validate()
            .map_err(|err| fail(format!("inconsistent RSA key: {err}")))?;

        // jsonwebtoken takes the private half as PKCS8 PEM.
        let pkcs8_pem = private_key
            .to_pkcs8_pem(rsa::pkcs8::LineEnding::LF)
            .map_err(|err| fail(format!("PKCS8 export failed: {err}")))?;
        let encoding_key = EncodingKey::from_rsa_pem(pkcs8_pem.as_bytes())
            .map_err(|err| fail(format!("unusable private key: {err}")))?;

        let n = URL_SAFE_NO_PAD.encode(private_key.n().to_bytes_be());
        let e = URL_SAFE_NO_PAD.encode(private_key.e().to_bytes_be());
        let decoding_key = DecodingKey::from_rsa_components(&n, &e)
            .map_err(|err| fail(format!("unusable public key: {err}")))?;

        Ok(Self {
            kid: key.kid.clone(),
            encoding_key,
            decoding_key,
            n,
            e,
        })
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    fn jwk(&self) -> JwkEntry {
        JwkEntry {
            kty: "RSA",
            alg: SIGNING_ALG,
            r#use: "sig",
            kid: self.kid.clone(),
            n: self.n.clone(),
            e: self.e.clone(),
        }
    }
}

/// All signing keys of the engine. The first one signs new tokens.
pub struct KeyStore {
    keys: Vec<SigningMaterial>,
}

impl KeyStore {
    pub fn from_keys(keys: &[SigningKey]) -> Result<Self, BuildError> {
        let mut material = Vec::with_capacity(keys.len());
        for key in keys {
            match key.kty {
                KeyType::Rsa => material.push(SigningMaterial::from_rsa_jwk(key)?),
                other => {
                    return Err(BuildError::SigningKey {
                        kid: key.kid.clone(),
                        reason: format!("{} keys cannot sign {SIGNING_ALG} tokens", other.as_str()),
                    })
                }
            }
        }
        if material.is_empty() {
            return Err(BuildError::NoRsaKey);
        }
        Ok(Self { keys: material })
    }

    pub fn primary(&self) -> &SigningMaterial {
        &self.keys[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &SigningMaterial> {
        self.keys.iter()
    }

    pub fn find(&self, kid: &str) -> Option<&SigningMaterial> {
        self.keys.iter().find(|k| k.kid == kid)
    }

    /// Public JWK set; private parameters are never included.
    pub fn jwks(&self) -> JwksResponse {
        JwksResponse {
            keys: self.keys.iter().map(SigningMaterial::jwk).collect(),
        }
    }
}

fn jwk_uint(key: &SigningKey, name: &str) -> Result<BigUint, BuildError> {
    let raw = key.param(name).ok_or_else(|| BuildError::SigningKey {
        kid: key.kid.clone(),
        reason: format!("missing RSA parameter '{name}'"),
    })?;
    let bytes = URL_SAFE_NO_PAD
        .decode(raw.trim_end_matches('='))
        .map_err(|_| BuildError::SigningKey {
            kid: key.kid.clone(),
            reason: format!("RSA parameter '{name}' is not base64url"),
        })?;
    Ok(BigUint::from_bytes_be(&bytes))
}

/// JWKS response body.
#[derive(Debug, Clone, Serialize)]
pub struct JwksResponse {
    pub keys: Vec<JwkEntry>,
}

/// A single public JWK entry.
#[derive(Debug, Clone, Serialize)]
pub struct JwkEntry {
    pub kty: &'static str,
    pub alg: &'static str,
    #[serde(rename = "use")]
    pub r#use: &'static str,
    pub kid: String,
    pub n: String,
    pub e: String,
}
