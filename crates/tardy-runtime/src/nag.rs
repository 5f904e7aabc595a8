//! Violator set rebuild and expiry.
//!
//! A nag cycle is one rebuild followed by one single-shot expiry timer. The
//! timer is tied to the generation it was armed for, so a later rebuild is
//! never wiped by an earlier cycle's timer.

use std::sync::Arc;
use std::time::Duration;

use tardy_compliance::{ComplianceError, ComplianceRecord};
use tardy_core::Categorized;
use tardy_state::{DirectoryMap, Generation, ViolatorMap};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::context::BotContext;
use crate::refresher::delayed_ticker;

/// Outcome of one rebuild.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RebuildReport {
    /// Generation of the installed set.
    pub generation: Generation,
    /// Late users reported by the feed.
    pub records: usize,
    /// Late users with a directory entry, now in the set.
    pub violators: usize,
}

/// Join late users against the directory.
///
/// Records without a mapping are dropped; that is a normal outcome.
pub fn join(records: &[ComplianceRecord], directory: &DirectoryMap) -> ViolatorMap {
    let mut violators = ViolatorMap::with_capacity(records.len());
    for record in records {
        if record.external_id.is_empty() {
            continue;
        }
        match directory.get(&record.external_id) {
            Some(chat_id) => {
                let _ = violators.insert(chat_id.clone(), record.external_id.clone());
            }
            None => debug!(
                email = %record.external_id,
                name = %record.display_name(),
                "late user has no chat account"
            ),
        }
    }
    violators
}

/// Recompute the violator set from the feed and install it.
///
/// All I/O happens before the directory snapshot is taken; on failure the
/// current set is left untouched.
#[instrument(skip(ctx))]
pub async fn rebuild(ctx: &BotContext) -> Result<RebuildReport, ComplianceError> {
    let records = ctx.compliance.non_compliant_now().await?;
    let directory = ctx.directory.snapshot();
    let violators = join(&records, &directory);
    let count = violators.len();
    let generation = ctx.violators.install(violators);

    info!(%generation, records = records.len(), violators = count, "violator set rebuilt");
    Ok(RebuildReport {
        generation,
        records: records.len(),
        violators: count,
    })
}

/// Spawn the expiry timer for `generation`.
///
/// The task resolves to `true` if it cleared the set, `false` if a newer
/// generation superseded it or shutdown cancelled it.
pub fn arm_expiry(ctx: Arc<BotContext>, generation: Generation, window: Duration) -> JoinHandle<bool> {
    let tasks = ctx.tasks.clone();
    tasks.spawn(async move {
        tokio::select! {
            () = tokio::time::sleep(window) => {
                let cleared = ctx.violators.expire(generation);
                if cleared {
                    info!(%generation, "nag window elapsed, violator set cleared");
                } else {
                    debug!(%generation, "nag window elapsed for superseded set");
                }
                cleared
            }
            () = ctx.cancel.cancelled() => false,
        }
    })
}

/// Rebuild once and arm one expiry timer for the configured nag window.
pub async fn start_nag_cycle(ctx: &Arc<BotContext>) -> Result<RebuildReport, ComplianceError> {
    let report = rebuild(ctx).await?;
    let window = ctx.settings.schedule.nag_window();
    drop(arm_expiry(Arc::clone(ctx), report.generation, window));
    Ok(report)
}

/// Start a nag cycle every `interval` until cancelled.
#[instrument(skip(ctx))]
pub async fn run_auto_nag(ctx: Arc<BotContext>, interval: Duration) {
    let Some(mut ticker) = delayed_ticker(interval) else {
        error!(?interval, "unusable auto-nag interval, automatic nagging disabled");
        return;
    };

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = start_nag_cycle(&ctx).await {
                    warn!(error = %e, category = %e.category(), "scheduled nag cycle failed");
                }
            }
            () = ctx.cancel.cancelled() => return,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
