//! Axum HTTP server exposing `/health`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use tardy_runtime::BotContext;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::health::{self, HealthResponse};

/// State shared by the handlers.
#[derive(Clone)]
pub struct AppState {
    /// Bot state the counters are read from.
    pub ctx: Arc<BotContext>,
    /// When the process started.
    pub start_time: Instant,
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let ctx = &state.ctx;
    Json(health::health_check(
        state.start_time,
        ctx.directory.len(),
        ctx.violators.len(),
        ctx.privileged.len(),
    ))
}

/// Bind `host:port` and serve on the context's task tracker until its token
/// is cancelled.
///
/// Returns the bound address (useful with port 0) and the server task.
pub async fn listen(state: AppState, host: &str, port: u16) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind((host, port)).await?;
    let addr = listener.local_addr()?;
    let cancel = state.ctx.cancel.clone();
    let tasks = state.ctx.tasks.clone();
    let app = router(state);

    let handle = tasks.spawn(async move {
        let serve = axum::serve(listener, app).with_graceful_shutdown(async move { cancel.cancelled().await });
        if let Err(e) = serve.await {
            warn!(error = %e, "health server stopped");
        }
    });
    info!(%addr, "health endpoint listening");
    Ok((addr, handle))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
