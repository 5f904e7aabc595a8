//! Outbound texts and notifications.
//!
//! Sends are best effort: a failure is logged with `warn!` and counted,
//! never retried.

use std::collections::HashSet;

use tardy_compliance::ComplianceError;
use tardy_core::{Categorized, ChannelId, ChatId, ExternalId};
use tracing::{info, instrument, warn};

use crate::context::BotContext;

/// Acknowledgement for the reminder blast command.
pub const SLAP_ACK: &str = "Slapping Users!";
/// Acknowledgement for the nag cycle command.
pub const BOTHER_ACK: &str = "Starting to bother users!";
/// Reply to `ping`.
pub const PONG: &str = "pong";
/// Reply to `tick`.
pub const TOCK: &str = "tock";
/// Sent when the compliance feed cannot be queried for a command.
pub const FEED_UNAVAILABLE: &str = "Sorry, I can't reach Tock right now. Try again in a bit.";

/// Admin command reference.
pub fn help_text(bot: &ChatId) -> String {
    let m = bot.mention();
    format!(
        "Commands:\n Message tardy users `{m}: slap users!`\n\
         Bother tardy users `{m}: bother users!`\n\
         Find out who is late `{m}: who is late?`"
    )
}

/// `<@U1>, <@U2> are late! 2 people total.`
pub fn roster_text(late: &[ChatId]) -> String {
    if late.is_empty() {
        return "Nobody is late! 0 people total.".to_string();
    }
    let mentions: Vec<String> = late.iter().map(ChatId::mention).collect();
    format!("{} are late! {} people total.", mentions.join(", "), late.len())
}

/// Sent to a flagged user who turns out to have reported after all.
pub fn relieved_text(user: &ChatId) -> String {
    format!(
        "{}, I was about to yell at you, but then I realized you actually filled out your timesheet. Thanks! ^_^",
        user.mention()
    )
}

/// Answer to a user asking for their own status.
pub fn status_text(user: &ChatId, late: bool) -> String {
    if late {
        format!("{}, you're late -_-", user.mention())
    } else {
        format!("{}, you're on time! ^_^", user.mention())
    }
}

/// Status answer for a user the directory does not know.
pub fn unknown_user_text(user: &ChatId) -> String {
    format!("{}, I can't find your Tock account, so I can't tell.", user.mention())
}

/// Post `text` to `channel`. Returns whether the send succeeded.
pub async fn reply(ctx: &BotContext, channel: &ChannelId, text: &str) -> bool {
    match ctx.chat.send_to_channel(channel, text).await {
        Ok(()) => true,
        Err(e) => {
            warn!(%channel, error = %e, category = %e.category(), "reply failed");
            false
        }
    }
}

/// Chat ids of every late user who has a directory entry, in feed order.
pub async fn late_roster(ctx: &BotContext) -> Result<Vec<ChatId>, ComplianceError> {
    let records = ctx.compliance.non_compliant_now().await?;
    let directory = ctx.directory.snapshot();
    let mut seen = HashSet::new();
    Ok(records
        .iter()
        .filter_map(|r| directory.get(&r.external_id))
        .filter(|id| seen.insert((*id).clone()))
        .cloned()
        .collect())
}

/// Outcome of a reminder blast.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SlapReport {
    /// Reminders delivered.
    pub sent: usize,
    /// Reminders that failed to send.
    pub failed: usize,
}

/// Direct-message a random reminder to every resolvable late user.
#[instrument(skip(ctx))]
pub async fn slap_late_users(ctx: &BotContext) -> Result<SlapReport, ComplianceError> {
    let late = late_roster(ctx).await?;
    let mut report = SlapReport::default();
    for user in &late {
        let text = ctx.messages.reminder();
        match ctx.chat.send_direct(user, &text).await {
            Ok(()) => report.sent += 1,
            Err(e) => {
                report.failed += 1;
                warn!(%user, error = %e, category = %e.category(), "reminder failed");
            }
        }
    }
    info!(sent = report.sent, failed = report.failed, "late users slapped");
    Ok(report)
}

/// Tell `user` in `channel` whether they are late right now.
pub async fn report_status(ctx: &BotContext, user: &ChatId, channel: &ChannelId) {
    let Some(external_id) = ctx.directory.external_id_for(user) else {
        let _ = reply(ctx, channel, &unknown_user_text(user)).await;
        return;
    };
    let text = match ctx.compliance.is_non_compliant(&external_id).await {
        Ok(late) => status_text(user, late),
        Err(e) => {
            warn!(%user, error = %e, "status check failed");
            FEED_UNAVAILABLE.to_string()
        }
    };
    let _ = reply(ctx, channel, &text).await;
}

/// Answer a flagged user after re-checking the feed: scold if still late,
/// thank them otherwise. A failed re-check counts as still late.
pub async fn answer_violator(ctx: &BotContext, user: &ChatId, channel: &ChannelId, external_id: &ExternalId) {
    let still_late = match ctx.compliance.is_non_compliant(external_id).await {
        Ok(late) => late,
        Err(e) => {
            warn!(email = %external_id, error = %e, "re-check failed, assuming still late");
            true
        }
    };
    let text = if still_late {
        ctx.messages.angry(user)
    } else {
        relieved_text(user)
    };
    info!(%user, still_late, "violator answered");
    let _ = reply(ctx, channel, &text).await;
}

/// Post the late roster to `channel`, or an apology if the feed is down.
pub async fn report_roster(ctx: &BotContext, channel: &ChannelId) {
    let text = match late_roster(ctx).await {
        Ok(late) => roster_text(&late),
        Err(e) => {
            warn!(error = %e, category = %e.category(), "roster query failed");
            FEED_UNAVAILABLE.to_string()
        }
    };
    let _ = reply(ctx, channel, &text).await;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Sent, TestBot};

    #[test]
    fn roster_format() {
        let late = [ChatId::from("U1"), ChatId::from("U2")];
        assert_eq!(roster_text(&late), "<@U1>, <@U2> are late! 2 people total.");
        assert_eq!(roster_text(&[]), "Nobody is late! 0 people total.");
    }

    #[test]
    fn help_lists_three_commands() {
        let help = help_text(&ChatId::from("B1"));
        assert!(help.starts_with("Commands:\n"));
        assert!(help.contains("`<@B1>: slap users!`"));
        assert!(help.contains("`<@B1>: bother users!`"));
        assert!(help.contains("`<@B1>: who is late?`"));
    }

    #[test]
    fn status_texts() {
        let u = ChatId::from("U1");
        assert_eq!(status_text(&u, true), "<@U1>, you're late -_-");
        assert_eq!(status_text(&u, false), "<@U1>, you're on time! ^_^");
        assert!(relieved_text(&u).starts_with("<@U1>, I was about to yell at you"));
    }

    #[tokio::test]
    async fn roster_skips_unmapped_and_duplicates() {
        let bot = TestBot::builder()
            .directory(&[("a@x.org", "U1"), ("b@x.org", "U2")])
            .late(&["b@x.org", "ghost@x.org", "a@x.org", "B@x.org"])
            .build();
        let roster = late_roster(&bot.ctx).await.unwrap();
        assert_eq!(roster, vec![ChatId::from("U2"), ChatId::from("U1")]);
    }

    #[tokio::test]
    async fn slap_counts_sent_and_failed() {
        let bot = TestBot::builder()
            .directory(&[("a@x.org", "U1"), ("b@x.org", "U2")])
            .late(&["a@x.org", "b@x.org"])
            .build();
        bot.chat.fail_sends_to(&["U2"]);

        let report = slap_late_users(&bot.ctx).await.unwrap();
        assert_eq!(report, SlapReport { sent: 1, failed: 1 });

        let sent = bot.chat.sent();
        assert_eq!(sent.len(), 1);
        assert!(matches!(&sent[0], Sent::Direct { user, .. } if user.as_str() == "U1"));
    }

    #[tokio::test]
    async fn slap_propagates_feed_failure() {
        let bot = TestBot::builder().build();
        bot.feed.fail(true);
        assert!(slap_late_users(&bot.ctx).await.is_err());
        assert!(bot.chat.sent().is_empty());
    }

    #[tokio::test]
    async fn roster_apologizes_when_feed_is_down() {
        let bot = TestBot::builder().build();
        bot.feed.fail(true);
        let channel = ChannelId::from("C1");
        report_roster(&bot.ctx, &channel).await;
        assert_eq!(bot.chat.channel_texts(&channel), vec![FEED_UNAVAILABLE]);
    }

    #[tokio::test]
    async fn violator_who_caught_up_is_thanked() {
        let bot = TestBot::builder().late(&["b@x.org"]).build();
        let channel = ChannelId::from("C1");
        let user = ChatId::from("U1");
        answer_violator(&bot.ctx, &user, &channel, &ExternalId::from("a@x.org")).await;
        assert_eq!(bot.chat.channel_texts(&channel), vec![relieved_text(&user)]);
    }

    #[tokio::test]
    async fn status_for_unknown_user() {
        let bot = TestBot::builder().build();
        let channel = ChannelId::from("C1");
        report_status(&bot.ctx, &ChatId::from("U7"), &channel).await;
        assert_eq!(
            bot.chat.channel_texts(&channel),
            vec!["<@U7>, I can't find your Tock account, so I can't tell."]
        );
    }
}
