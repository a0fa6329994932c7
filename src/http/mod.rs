//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, entry handler)
//!     → request.rs (request ID, URI rewrite after normalization)
//!     → [engine handles the protocol]
//!     → response.rs (error envelope, landing page)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use response::{AdapterError, ErrorEnvelope};
pub use server::{AppState, HttpServer};
