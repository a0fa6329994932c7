//! OpenID Connect protocol engine.
//!
//! # Data Flow
//! ```text
//! ProviderSettings ──▶ Engine::new ──▶ KeyStore (RSA JWKs → signing material)
//!                            │
//!                            ▼
//!                     Engine::initialize ──▶ probe sign/verify per key
//!                            │               discovery + JWKS precomputed
//!                            ▼
//! Request ──▶ Engine::handle ──▶ engine Router
//!                                   ├── /.well-known/openid-configuration, /jwks
//!                                   ├── /auth ──▶ /interaction/{uid}[/login|/abort]
//!                                   ├── /token (authorization_code, refresh_token,
//!                                   │           client_credentials)
//!                                   └── /me, /token/introspection, /token/revocation
//! ```
//!
//! # Design Decisions
//! - Opaque access and refresh tokens live in a process-local `GrantStore`
//! - ID tokens are RS256 JWTs signed with the first RSA key
//! - The engine owns the root of its path space; mounting is the caller's job

pub mod client;
pub mod cookies;
pub mod engine;
pub mod error;
pub(crate) mod handlers;
pub mod keys;
pub mod settings;
pub mod store;
pub mod token;

pub use engine::Engine;
pub use error::{BuildError, ProtocolError};
pub use settings::{ClientMetadata, Features, FindAccount, GrantType, ProviderSettings, TokenTtl};
