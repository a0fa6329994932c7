//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Engine (manager.rs + startup.rs):
//!     first request → EngineManager::engine()
//!         ├── ready slot set      → return it
//!         ├── in-flight slot set  → await the shared handle
//!         └── neither             → load config → engine_settings → Engine::new
//!                                   → initialize → fill ready slot
//!
//! Shutdown (shutdown.rs):
//!     trigger → broadcast → server stops accepting → drain → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//! ```
//!
//! # Design Decisions
//! - Construction is lazy: the process starts and listens even with a
//!   broken configuration, and every request reports the failure
//! - A failed construction is never cached
//! - No config reload: configuration changes require a restart

pub mod manager;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use manager::{EngineError, EngineManager};
pub use shutdown::Shutdown;
pub use startup::{build_engine, build_engine_from, engine_manager, engine_settings};
