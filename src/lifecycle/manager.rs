//! Lazy, race-safe ownership of the single engine instance.
//!
//! Two slots live behind one mutex: the ready engine and the in-flight
//! construction. The lock is never held across an await; callers clone the
//! in-flight handle and await it outside the lock, so every concurrent caller
//! observes the same construction and the same result.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::future::{BoxFuture, FutureExt, Shared};

use crate::config::ConfigError;
use crate::observability::metrics;
use crate::provider::BuildError;

/// Failure to obtain an engine. Cloned to every caller that awaited the
/// same construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("engine construction failed: {0}")]
    Construction(String),
}

impl From<BuildError> for EngineError {
    fn from(err: BuildError) -> Self {
        EngineError::Construction(err.to_string())
    }
}

type Construction<E> = Shared<BoxFuture<'static, Result<Arc<E>, EngineError>>>;
type Builder<E> = Box<dyn Fn() -> BoxFuture<'static, Result<E, EngineError>> + Send + Sync>;

struct Slots<E> {
    ready: Option<Arc<E>>,
    in_flight: Option<Construction<E>>,
}

/// Owns the engine singleton. Construction happens on first use, at most
/// once successfully; a failed construction is forgotten so the next call
/// retries.
pub struct EngineManager<E> {
    build: Builder<E>,
    slots: Mutex<Slots<E>>,
}

impl<E: Send + Sync + 'static> EngineManager<E> {
    pub fn new<F, Fut>(build: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<E, EngineError>> + Send + 'static,
    {
        Self {
            build: Box::new(move || build().boxed()),
            slots: Mutex::new(Slots {
                ready: None,
                in_flight: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slots<E>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The engine, constructing it if this is the first use.
    pub async fn engine(&self) -> Result<Arc<E>, EngineError> {
        let handle = {
            let mut slots = self.lock();
            if let Some(engine) = &slots.ready {
                return Ok(engine.clone());
            }
            match &slots.in_flight {
                Some(handle) => handle.clone(),
                None => {
                    let handle = self.start();
                    slots.in_flight = Some(handle.clone());
                    handle
                }
            }
        };

        let result = handle.clone().await;

        let mut slots = self.lock();
        // Only the first caller to settle this construction updates the slots.
        let owns_slot = slots
            .in_flight
            .as_ref()
            .is_some_and(|current| current.ptr_eq(&handle));
        if owns_slot {
            slots.in_flight = None;
            match &result {
                Ok(engine) => {
                    slots.ready = Some(engine.clone());
                    metrics::record_construction(true);
                    tracing::info!("Engine constructed");
                }
                Err(err) => {
                    metrics::record_construction(false);
                    tracing::error!(error = %err, "Engine construction failed; next request retries");
                }
            }
        }
        result
    }

    /// The ready engine, without triggering construction.
    pub fn current(&self) -> Option<Arc<E>> {
        self.lock().ready.clone()
    }

    /// Spawns construction so it settles even if every waiting request
    /// is dropped.
    fn start(&self) -> Construction<E> {
        tracing::info!("Constructing engine");
        let task = tokio::spawn((self.build)());
        async move {
            match task.await {
                Ok(result) => result.map(Arc::new),
                Err(join) => Err(EngineError::Construction(format!(
                    "construction task aborted: {join}"
                ))),
            }
        }
        .boxed()
        .shared()
    }
}
