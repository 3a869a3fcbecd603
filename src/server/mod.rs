//! Server module
//!
//! Axum router for the WebSocket endpoint and the snapshot routes, plus the
//! listener loop with graceful shutdown.

pub mod http;
pub mod ws;

use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::info;

use crate::session::SessionCoordinator;

/// Server errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Shared state handed to every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub coordinator: Arc<SessionCoordinator>,
    /// Capacity of each connection's outbound event queue
    pub queue_size: usize,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(coordinator: Arc<SessionCoordinator>, queue_size: usize) -> Self {
        Self {
            coordinator,
            queue_size: queue_size.max(1),
            started_at: Instant::now(),
        }
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/api/polls", get(http::list_polls))
        .route("/api/students", get(http::list_students))
        .route("/api/chat", get(http::chat_history))
        .route("/health", get(http::health))
        .with_state(state)
}

/// Bind `addr` and serve until `shutdown` resolves.
pub async fn serve<F>(addr: &str, state: AppState, shutdown: F) -> Result<(), ServerError>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    serve_listener(listener, state, shutdown).await
}

/// Serve on an already bound listener.
pub async fn serve_listener<F>(
    listener: TcpListener,
    state: AppState,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let local: SocketAddr = listener.local_addr()?;
    info!(address = %local, "classpoll listening");
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // Without a signal handler the server runs until killed.
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
