//! Web server for Logscope
//!
//! Routes requests for a session's logs to the node client registered
//! under that session name.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use logscope_core::NodeLogClient;
use logscope_core::config::ServerConfig;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{download_log, health, list_logs, log_head, log_tail};

/// Shared state of all handlers.
///
/// Sessions map an operator-facing name to the client of the node that is
/// currently allocated to it.
#[derive(Clone)]
pub struct AppState {
    sessions: Arc<RwLock<HashMap<String, NodeLogClient>>>,
    shutdown: CancellationToken,
}

impl AppState {
    /// Creates state without sessions. Cancelling `shutdown` interrupts
    /// every request that is waiting on a node.
    pub fn new(shutdown: CancellationToken) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            shutdown,
        }
    }

    /// Registers `client` under `name`, replacing any previous node.
    pub async fn add_session(&self, name: impl Into<String>, client: NodeLogClient) {
        let name = name.into();
        tracing::info!("Session {} allocated", name);
        self.sessions.write().await.insert(name, client);
    }

    /// Number of sessions whose dispatcher still accepts requests.
    pub async fn connected_count(&self) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|client| client.is_connected())
            .count()
    }

    /// Client of the node allocated to `name`, if any.
    pub async fn session(&self, name: &str) -> Option<NodeLogClient> {
        self.sessions.read().await.get(name).cloned()
    }

    /// Number of allocated sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Token cancelled when the server shuts down.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }
}

/// Builds the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sessions/{session}/logs", get(list_logs))
        .route("/sessions/{session}/logs/{file}/head", get(log_head))
        .route("/sessions/{session}/logs/{file}/tail", get(log_tail))
        .route("/sessions/{session}/logs/{file}/download", get(download_log))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Serves the router until the state's shutdown token is cancelled.
///
/// # Errors
///
/// - `std::io::Error` - If the listener cannot be bound or the server fails
pub async fn run_server(
    config: &ServerConfig,
    state: AppState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let shutdown = state.shutdown_token().clone();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!("Logscope server running on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("Logscope server stopped");
    Ok(())
}
