//! Application container.
//!
//! # Responsibilities
//! - Own the validated configuration and the frozen route registry
//! - Wire the dispatch pipeline into the transport (axum Router)
//! - Own the listener lifecycle: serve, graceful shutdown, sweeper task
//!
//! # Design Decisions
//! - One Application object owns all process-scoped state with an explicit
//!   construction/shutdown lifecycle; nothing lives in module globals
//! - The transport sees a single catch-all handler; routing, sessions,
//!   auth and CORS are the pipeline's business, not the Router's

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::response::Response;
use axum::routing::any;
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::cors::{CorsRuleError, CorsRuleSet};
use crate::error::HttpError;
use crate::pipeline;
use crate::routing::{RegistryError, RouteRegistry, ServiceRoutes};
use crate::session::{InMemorySessionStore, SessionStore};

/// Construction failure: the declared routes or CORS rules are unusable.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Cors(#[from] CorsRuleError),
}

/// Everything the pipeline needs per request, shared across workers.
#[derive(Clone)]
pub(crate) struct AppState {
    pub registry: Arc<RouteRegistry>,
    pub sessions: Arc<dyn SessionStore>,
    pub cors: Arc<CorsRuleSet>,
    pub cookie_name: String,
    pub handler_timeout: Duration,
    pub expose_internal_errors: bool,
}

/// Owns configuration, the frozen registry, the session store and the
/// HTTP listener lifecycle.
pub struct Application {
    config: AppConfig,
    state: AppState,
    // Kept concrete so the sweeper can be wired; None when the caller
    // brought their own store.
    memory_store: Option<Arc<InMemorySessionStore>>,
}

impl Application {
    /// Build with the default in-memory session store.
    pub fn new(config: AppConfig, routes: ServiceRoutes) -> Result<Self, BuildError> {
        let store = Arc::new(InMemorySessionStore::new(Duration::from_secs(
            config.session.ttl_secs,
        )));
        let mut app = Self::with_store(config, routes, store.clone())?;
        app.memory_store = Some(store);
        Ok(app)
    }

    /// Build against a caller-provided session backend.
    pub fn with_store(
        config: AppConfig,
        routes: ServiceRoutes,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self, BuildError> {
        let registry = Arc::new(RouteRegistry::build(routes)?);
        let cors = Arc::new(CorsRuleSet::from_config(&config.cors)?);
        let state = AppState {
            registry,
            sessions,
            cors,
            cookie_name: config.session.cookie_name.clone(),
            handler_timeout: Duration::from_secs(config.timeouts.handler_secs),
            expose_internal_errors: config.diagnostics.expose_internal_errors,
        };
        Ok(Self {
            config,
            state,
            memory_store: None,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The shared session store, for services and tests.
    pub fn session_store(&self) -> Arc<dyn SessionStore> {
        self.state.sessions.clone()
    }

    /// Bind the configured listener address.
    pub async fn bind(&self) -> Result<TcpListener, std::io::Error> {
        TcpListener::bind(&self.config.listener.bind_address).await
    }

    /// Build the transport-side router: one catch-all into the pipeline.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/{*path}", any(dispatch_entry))
            .route("/", any(dispatch_entry))
            .with_state(self.state.clone())
            .layer(TimeoutLayer::new(Duration::from_secs(
                self.config.timeouts.request_secs,
            )))
            .layer(TraceLayer::new_for_http())
    }

    /// Serve until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        if let Some(store) = &self.memory_store {
            let every = self.config.session.sweep_interval_secs;
            if every > 0 {
                InMemorySessionStore::spawn_sweeper(
                    store.clone(),
                    Duration::from_secs(every),
                    shutdown.resubscribe(),
                );
            }
        }

        let app = self.router();
        let mut shutdown = shutdown;
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve until Ctrl+C.
    pub async fn run_until_ctrl_c(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let (tx, rx) = broadcast::channel(1);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown signal received");
                let _ = tx.send(());
            }
        });
        self.run(listener, rx).await
    }
}

async fn dispatch_entry(State(state): State<AppState>, request: Request<Body>) -> Response {
    // Spawned so a client disconnect cannot cancel session finalization
    // mid-flight; a panicking handler surfaces as a plain 500.
    let expose_internal_errors = state.expose_internal_errors;
    match tokio::spawn(pipeline::dispatch(state, request)).await {
        Ok(response) => response,
        Err(join_error) => {
            tracing::error!(error = %join_error, "Dispatch task failed");
            HttpError::Internal(join_error.to_string()).into_response_with(expose_internal_errors)
        }
    }
}
