//! HTTP server setup and the adapter entry point.
//!
//! # Responsibilities
//! - Create the Axum Router with a catch-all entry handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Obtain the engine, normalize the path, delegate the request
//! - Translate adapter failures into the error envelope
//! - Observability (metrics, correlation IDs)

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::http::request::{
    propagate_request_id_layer, rewrite_uri, set_request_id_layer, RequestIdExt,
};
use crate::http::response::{landing_response, AdapterError};
use crate::lifecycle::EngineManager;
use crate::observability::metrics::{self, Outcome};
use crate::observability::tracing::request_span;
use crate::provider::Engine;
use crate::routing::{normalize, Normalized};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engines: Arc<EngineManager<Engine>>,
}

/// HTTP server for the OIDC endpoint.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &ServerConfig, engines: Arc<EngineManager<Engine>>) -> Self {
        let router = Self::build_router(config, AppState { engines });
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        Router::new()
            // Fallback, not a wildcard route: no outer path params reach the engine.
            .fallback(entry_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Entry point for every request.
async fn entry_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let request_id = request.request_id().to_string();

    let (response, outcome) = match dispatch(&state, request).await {
        Ok(answered) => answered,
        Err(err) => {
            tracing::error!(
                request_id = %request_id,
                code = err.code(),
                error = %err,
                "Request failed in adapter"
            );
            (err.into_response(), Outcome::Error)
        }
    };

    tracing::debug!(
        request_id = %request_id,
        status = response.status().as_u16(),
        outcome = outcome.as_str(),
        "Request answered"
    );
    metrics::record_request(method.as_str(), response.status().as_u16(), outcome, start);
    response
}

async fn dispatch(
    state: &AppState,
    request: Request<Body>,
) -> Result<(Response, Outcome), AdapterError> {
    let engine = state.engines.engine().await?;

    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    match normalize(target, request.method()) {
        Normalized::Landing(landing) => Ok((landing_response(landing), Outcome::Landing)),
        Normalized::Forward(path) => {
            let request = rewrite_uri(request, &path)?;
            Ok((engine.handle(request).await, Outcome::Engine))
        }
    }
}
