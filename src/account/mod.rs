//! Synthetic account resolution.
//!
//! There is no credential store: every subject identifier is accepted and
//! answered with the same claims shape. Only `sub` and the derived email
//! vary with the input.

use serde::Serialize;

/// Domain appended to the subject identifier to form the email claim.
pub const EMAIL_DOMAIN: &str = "example.com";

/// Identity claims for an authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub email_verified: bool,
    pub name: String,
    pub given_name: String,
    pub family_name: String,
}

impl Claims {
    /// Claims released for the granted scopes (`openid`, `email`, `profile`).
    pub fn for_scopes<'a>(
        &self,
        scopes: impl IntoIterator<Item = &'a str>,
    ) -> serde_json::Map<String, serde_json::Value> {
        use serde_json::Value;

        let mut out = serde_json::Map::new();
        out.insert("sub".into(), Value::String(self.sub.clone()));
        for scope in scopes {
            match scope {
                "email" => {
                    out.insert("email".into(), Value::String(self.email.clone()));
                    out.insert("email_verified".into(), Value::Bool(self.email_verified));
                }
                "profile" => {
                    out.insert("name".into(), Value::String(self.name.clone()));
                    out.insert("given_name".into(), Value::String(self.given_name.clone()));
                    out.insert("family_name".into(), Value::String(self.family_name.clone()));
                }
                _ => {}
            }
        }
        out
    }
}

/// Fabricate the claims bundle for `sub`. Never fails.
pub fn resolve_claims(sub: &str) -> Claims {
    Claims {
        sub: sub.to_string(),
        email: format!("{sub}@{EMAIL_DOMAIN}"),
        email_verified: true,
        name: "Test User".to_string(),
        given_name: "Test".to_string(),
        family_name: "User".to_string(),
    }
}
