//! Mock OpenID Connect provider.

pub mod account;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod provider;
pub mod routing;

pub use config::{ProviderConfig, ServerConfig};
pub use http::HttpServer;
pub use lifecycle::{EngineManager, Shutdown};
pub use provider::Engine;
