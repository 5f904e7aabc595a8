//! Directory refresher.
//!
//! Pulls the full member list, keeps real people with an email, and swaps the
//! result into the directory cache in one step. Privileged emails are then
//! resolved to chat ids.

use std::sync::Arc;
use std::time::Duration;

use tardy_chat::{ChatError, ChatMember};
use tardy_core::{Categorized, ExternalId};
use tardy_state::DirectoryMap;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{error, info, instrument, warn};

use crate::context::BotContext;

/// Outcome of one refresh.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Members returned by the platform.
    pub members: usize,
    /// Mappings installed.
    pub mapped: usize,
    /// Members left out (bots, deleted, no email).
    pub skipped: usize,
    /// Privileged emails rewritten to chat ids by this refresh.
    pub privileged_resolved: usize,
}

/// Build a complete directory from a member listing.
///
/// Returns the mapping and how many members were skipped.
pub fn build_directory(members: Vec<ChatMember>) -> (DirectoryMap, usize) {
    let mut map = DirectoryMap::with_capacity(members.len());
    let mut skipped = 0;
    for member in members {
        let email = ExternalId::from(member.email);
        if member.deleted || member.is_bot || email.is_empty() || member.chat_id.is_empty() {
            skipped += 1;
            continue;
        }
        // last write wins on duplicate emails
        let _ = map.insert(email, member.chat_id);
    }
    (map, skipped)
}

/// Refresh the directory once.
///
/// On failure the cache is left as it was.
#[instrument(skip(ctx))]
pub async fn refresh_directory(ctx: &BotContext) -> Result<RefreshReport, ChatError> {
    let members = ctx.chat.list_members().await?;
    let total = members.len();
    let (map, skipped) = build_directory(members);
    let mapped = map.len();

    ctx.directory.replace(map);
    let privileged_resolved = ctx.privileged.resolve(&ctx.directory.snapshot());

    let report = RefreshReport {
        members: total,
        mapped,
        skipped,
        privileged_resolved,
    };
    info!(
        members = report.members,
        mapped = report.mapped,
        skipped = report.skipped,
        privileged_resolved = report.privileged_resolved,
        "directory refreshed"
    );
    Ok(report)
}

/// Ticker whose first tick is one `interval` from now.
///
/// `None` for a zero interval or one that overflows the clock.
pub(crate) fn delayed_ticker(interval: Duration) -> Option<Interval> {
    if interval.is_zero() {
        return None;
    }
    let start = Instant::now().checked_add(interval)?;
    let mut ticker = tokio::time::interval_at(start, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Some(ticker)
}

/// Refresh every `interval` until cancelled. The first refresh happens one
/// interval from now; startup performs its own.
#[instrument(skip(ctx))]
pub async fn run_refresher(ctx: Arc<BotContext>, interval: Duration) {
    let Some(mut ticker) = delayed_ticker(interval) else {
        error!(?interval, "unusable refresh interval, refresher disabled");
        return;
    };

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = refresh_directory(&ctx).await {
                    warn!(error = %e, category = %e.category(), "directory refresh failed");
                }
            }
            () = ctx.cancel.cancelled() => {
                info!("refresher stopped");
                return;
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use tardy_core::ChatId;

    use super::*;
    use crate::testing::{FakeChat, TestBot, member};

    #[test]
    fn filters_bots_deleted_and_blank_emails() {
        let mut bot = member("B2", "bot@x.org");
        bot.is_bot = true;
        let mut gone = member("U9", "gone@x.org");
        gone.deleted = true;

        let (map, skipped) = build_directory(vec![
            member("U1", "A@X.org"),
            bot,
            gone,
            member("U3", ""),
        ]);
        assert_eq!(skipped, 3);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&ExternalId::from("a@x.org")), Some(&ChatId::from("U1")));
    }

    #[test]
    fn duplicate_email_last_wins() {
        let (map, _) = build_directory(vec![member("U1", "a@x.org"), member("U2", "a@x.org")]);
        assert_eq!(map.get(&ExternalId::from("a@x.org")), Some(&ChatId::from("U2")));
    }

    #[tokio::test]
    async fn refresh_replaces_cache_and_resolves_privileged() {
        let bot = TestBot::builder()
            .members(vec![member("U1", "a@x.org"), member("P1", "boss@x.org")])
            .privileged(&["boss@x.org"])
            .build();
        bot.ctx.directory.put(ExternalId::from("stale@x.org"), ChatId::from("U0"));

        let report = refresh_directory(&bot.ctx).await.unwrap();
        assert_eq!(report.mapped, 2);
        assert_eq!(report.privileged_resolved, 1);
        assert!(bot.ctx.directory.get(&ExternalId::from("stale@x.org")).is_none());
        assert_eq!(bot.ctx.privileged.entries(), vec!["P1"]);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_cache() {
        let bot = TestBot::builder().members(vec![member("U1", "a@x.org")]).build();
        let _ = refresh_directory(&bot.ctx).await.unwrap();

        bot.chat.fail_listing(true);
        assert!(refresh_directory(&bot.ctx).await.is_err());
        assert_eq!(bot.ctx.directory.get(&ExternalId::from("a@x.org")), Some(ChatId::from("U1")));
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_refresh_stops_on_cancel() {
        let chat = FakeChat::new("B1");
        chat.set_members(vec![member("U1", "a@x.org")]);
        let bot = TestBot::builder().chat(chat).build();

        let handle = tokio::spawn(run_refresher(Arc::clone(&bot.ctx), Duration::from_secs(60)));
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(bot.ctx.directory.len(), 1);

        bot.ctx.cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn unusable_intervals_are_rejected() {
        assert!(delayed_ticker(Duration::ZERO).is_none());
        assert!(delayed_ticker(Duration::MAX).is_none());
        assert!(delayed_ticker(Duration::from_secs(60)).is_some());
    }

    #[tokio::test]
    async fn zero_interval_refresher_exits_cleanly() {
        let bot = TestBot::builder().build();
        let handle = tokio::spawn(run_refresher(Arc::clone(&bot.ctx), Duration::ZERO));
        handle.await.unwrap();
    }
}
