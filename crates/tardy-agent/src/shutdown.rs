//! Process shutdown.
//!
//! The bot has two kinds of work to stop: loops that watch the context's
//! cancel token, and short tasks (replies, reminder blasts, expiry timers)
//! spawned onto the context's task tracker. Shutdown cancels the former and
//! waits, with a deadline, for the tracker to drain.

use std::time::Duration;

use tardy_runtime::BotContext;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

/// How long in-flight tasks get before the process exits anyway.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Stops every task of one [`BotContext`].
#[derive(Clone, Debug)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    tasks: TaskTracker,
}

impl ShutdownCoordinator {
    /// Coordinator for the token and tracker owned by `ctx`.
    pub fn for_context(ctx: &BotContext) -> Self {
        Self {
            token: ctx.cancel.clone(),
            tasks: ctx.tasks.clone(),
        }
    }

    /// Tasks still running.
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Cancel, stop accepting new tasks, and wait up to `grace` for the
    /// tracker to drain. Returns `true` if every task finished in time.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.token.cancel();
        let _ = self.tasks.close();
        info!(pending = self.pending(), grace_secs = grace.as_secs(), "waiting for tasks");

        if tokio::time::timeout(grace, self.tasks.wait()).await.is_ok() {
            return true;
        }
        warn!(pending = self.pending(), "shutdown grace elapsed, abandoning tasks");
        false
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
