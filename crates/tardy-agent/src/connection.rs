//! Keeps the live event stream connected.
//!
//! Each connection is drained by the dispatch loop. When it ends the source
//! is reconnected after an exponential backoff; a connection that stayed up
//! long enough resets the attempt counter.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tardy_chat::EventSource;
use tardy_core::retry::backoff_delay;
use tardy_runtime::{BotContext, RunOutcome};
use tokio::time::Instant;
use tracing::{info, instrument, warn};

/// A connection that lasted at least this long counts as healthy.
pub const STABLE_CONNECTION: Duration = Duration::from_secs(60);

/// Why the connection loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopExit {
    /// Shutdown was requested.
    Shutdown,
    /// The platform rejected the credentials.
    InvalidAuth,
}

/// Connect, dispatch, and reconnect until shutdown or an auth failure.
#[instrument(skip_all)]
pub async fn run_connection_loop(ctx: Arc<BotContext>, source: Arc<dyn EventSource>) -> LoopExit {
    let mut attempt: u32 = 0;
    loop {
        if ctx.cancel.is_cancelled() {
            return LoopExit::Shutdown;
        }

        let connected_at = Instant::now();
        let events = source.connect().await;
        match tardy_runtime::run(Arc::clone(&ctx), events).await {
            RunOutcome::Cancelled => return LoopExit::Shutdown,
            RunOutcome::InvalidAuth => return LoopExit::InvalidAuth,
            RunOutcome::Ended => {}
        }

        if connected_at.elapsed() >= STABLE_CONNECTION {
            attempt = 0;
        }
        let delay = backoff_delay(attempt, rand::rng().random::<f64>());
        attempt = attempt.saturating_add(1);
        warn!(attempt, delay_ms = delay.as_millis(), "event stream ended, reconnecting");

        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            () = ctx.cancel.cancelled() => {
                info!("shutdown during reconnect backoff");
                return LoopExit::Shutdown;
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
