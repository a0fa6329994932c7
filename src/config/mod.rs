//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! process environment
//!     → loader.rs (read settings, parse structured text)
//!     → validation.rs (semantic checks)
//!     → ProviderConfig (validated, immutable)
//!     → consumed once by the engine lifecycle manager
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a process restart
//! - Loading never touches disk or network
//! - Secrets are redacted from Debug output and error messages

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load, load_from, ConfigError};
pub use schema::{KeyType, ProviderConfig, ServerConfig, SigningKey};
