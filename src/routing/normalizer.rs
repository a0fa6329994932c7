//! Request path normalization.
//!
//! # Responsibilities
//! - Strip the public base prefix so the engine sees its native routes
//! - Alias `/authorize` to the engine's `/auth`
//! - Answer `GET /` with a landing page instead of delegating
//!
//! # Design Decisions
//! - Pure function over the path-and-query string; the inbound request is
//!   never mutated
//! - The prefix is stripped only on a segment boundary
//! - Landing is decided on the path component, the query is ignored

use axum::http::Method;

/// Public route prefix the engine is mounted under.
pub const BASE_PATH: &str = "/api/oidc";

const AUTHORIZE_ALIAS: &str = "/authorize";
const AUTHORIZE_NATIVE: &str = "/auth";

/// Outcome of normalizing one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    /// Path and query to hand to the engine.
    Forward(String),
    /// Answer directly; the engine is not consulted.
    Landing(Landing),
}

/// Static informational response for the bare root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Landing {
    pub body: String,
}

impl Landing {
    fn new() -> Self {
        Self {
            body: format!(
                "OIDC mock running.\n\
                 Discovery: {BASE_PATH}/.well-known/openid-configuration\n\
                 Keys: {BASE_PATH}/jwks\n"
            ),
        }
    }
}

/// Rewrite `path_and_query` for delegation to the engine.
pub fn normalize(path_and_query: &str, method: &Method) -> Normalized {
    let stripped = strip_base(path_and_query);
    let rewritten = alias_authorize(&stripped);

    let path = rewritten.split('?').next().unwrap_or_default();
    if path == "/" && (*method == Method::GET || *method == Method::HEAD) {
        return Normalized::Landing(Landing::new());
    }

    Normalized::Forward(rewritten)
}

fn strip_base(path_and_query: &str) -> String {
    match path_and_query.strip_prefix(BASE_PATH) {
        Some("") => "/".to_string(),
        Some(rest) if rest.starts_with('?') => format!("/{rest}"),
        Some(rest) if rest.starts_with('/') => rest.to_string(),
        _ => path_and_query.to_string(),
    }
}

fn alias_authorize(path: &str) -> String {
    match path.strip_prefix(AUTHORIZE_ALIAS) {
        Some(rest) if rest.is_empty() || rest.starts_with('?') => {
            format!("{AUTHORIZE_NATIVE}{rest}")
        }
        _ => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forward(path: &str) -> Normalized {
        Normalized::Forward(path.to_string())
    }

    #[test]
    fn test_base_root_is_landing() {
        assert!(matches!(normalize("/api/oidc", &Method::GET), Normalized::Landing(_)));
        assert!(matches!(normalize("/api/oidc/", &Method::GET), Normalized::Landing(_)));
        assert!(matches!(normalize("/api/oidc?probe=1", &Method::HEAD), Normalized::Landing(_)));
        assert!(matches!(normalize("/", &Method::GET), Normalized::Landing(_)));
    }

    #[test]
    fn test_landing_names_endpoints() {
        let Normalized::Landing(landing) = normalize("/api/oidc", &Method::GET) else {
            panic!("expected landing");
        };
        assert!(landing.body.contains("/api/oidc/.well-known/openid-configuration"));
        assert!(landing.body.contains("/api/oidc/jwks"));
    }

    #[test]
    fn test_root_non_read_is_forwarded() {
        assert_eq!(normalize("/api/oidc", &Method::POST), forward("/"));
    }

    #[test]
    fn test_authorize_alias() {
        assert_eq!(
            normalize("/api/oidc/authorize?client_id=x", &Method::GET),
            forward("/auth?client_id=x")
        );
        assert_eq!(normalize("/api/oidc/authorize", &Method::GET), forward("/auth"));
        assert_eq!(
            normalize("/api/oidc/authorizer", &Method::GET),
            forward("/authorizer")
        );
        assert_eq!(
            normalize("/api/oidc/authorize/extra", &Method::GET),
            forward("/authorize/extra")
        );
    }

    #[test]
    fn test_prefix_stripped() {
        assert_eq!(
            normalize("/api/oidc/.well-known/openid-configuration", &Method::GET),
            forward("/.well-known/openid-configuration")
        );
        assert_eq!(
            normalize("/api/oidc/token", &Method::POST),
            forward("/token")
        );
    }

    #[test]
    fn test_foreign_path_unchanged() {
        assert_eq!(normalize("/jwks", &Method::GET), forward("/jwks"));
        assert_eq!(normalize("/api/oidcx/jwks", &Method::GET), forward("/api/oidcx/jwks"));
        assert_eq!(normalize("/other/api/oidc", &Method::GET), forward("/other/api/oidc"));
    }
}
