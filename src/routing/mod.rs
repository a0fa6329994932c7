//! Request routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (public path, e.g. /api/oidc/authorize?...)
//!     → normalizer.rs (strip base prefix, alias, landing short-circuit)
//!     → Forward(path) → engine's native routes (/auth?...)
//!     → Landing       → answered by the entry point
//! ```

pub mod normalizer;

pub use normalizer::{normalize, Landing, Normalized, BASE_PATH};
