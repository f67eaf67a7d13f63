//! Read-only HTTP view of the backup progress
//!
//! `GET /state` returns the current `ProgressSnapshot` as JSON and
//! `GET /health` answers `ok`. Handlers only take snapshots and never block
//! the coordinator for longer than one copy.

use crate::backup::{ProgressSnapshot, ProgressState};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub fn build_router(progress: Arc<ProgressState>) -> Router {
    Router::new()
        .route("/state", get(state_handler))
        .route("/health", get(health_handler))
        .with_state(progress)
}

async fn state_handler(State(progress): State<Arc<ProgressState>>) -> Json<ProgressSnapshot> {
    Json(progress.snapshot())
}

async fn health_handler() -> &'static str {
    "ok"
}

/// Binds `bind` and serves until `shutdown` resolves
pub async fn serve<F>(
    bind: SocketAddr,
    progress: Arc<ProgressState>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(bind).await?;
    serve_on(listener, progress, shutdown).await
}

/// Serves on an already bound listener
pub async fn serve_on<F>(
    listener: TcpListener,
    progress: Arc<ProgressState>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tracing::info!(addr = %listener.local_addr()?, "Progress server listening");
    axum::serve(listener, build_router(progress))
        .with_graceful_shutdown(shutdown)
        .await
}
