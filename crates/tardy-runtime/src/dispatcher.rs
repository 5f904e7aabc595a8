//! Inbound event dispatch.
//!
//! Every message is classified once into a [`Route`] and answered in the
//! channel it came from. Classification order:
//!
//! 1. sender is a flagged violator: scold or thank them (entry consumed)
//! 2. addressed to the bot by a privileged user: admin command
//! 3. addressed to the bot by anyone else: casual reply
//! 4. not addressed: `tick` keyword, or an occasional reply to a mention
//!
//! "Addressed" means the text starts with the bot's `<@ID>` mention. Replies
//! that need the compliance feed run in spawned tasks, so a slow feed never
//! holds up the next event. Nothing that happens while handling one event
//! stops the loop; only an auth rejection or shutdown does.

use std::sync::Arc;

use futures::StreamExt;
use rand::Rng;
use tardy_chat::{ChatEvent, EventStream, MessageEvent};
use tardy_core::{Categorized, ExternalId};
use tracing::{debug, error, info, instrument, warn};

use crate::context::BotContext;
use crate::nag::start_nag_cycle;
use crate::notifier::{self, BOTHER_ACK, PONG, SLAP_ACK, TOCK, help_text, reply};

/// Admin commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Direct-message a reminder to every late user.
    Slap,
    /// Start a nag cycle.
    Bother,
    /// List late users.
    WhoIsLate,
    /// Anything else.
    Help,
}

/// Casual keywords anyone can use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Casual {
    /// Friendly reply.
    Hello,
    /// Check the sender's own compliance.
    Status,
    /// Liveness check.
    Ping,
}

/// What to do with one message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    /// No reply.
    Ignore,
    /// Sender was flagged; the entry has already been taken from the set.
    Violator {
        /// The sender's email, re-checked before answering.
        external_id: ExternalId,
    },
    /// Privileged user addressed the bot.
    Command(Command),
    /// Someone else addressed the bot.
    Casual(Casual),
    /// Unaddressed `tick`.
    Tock,
    /// The bot was mentioned mid-sentence and the dice said reply.
    Mention,
}

/// Result of handling one event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading.
    Continue,
    /// The connection can never succeed; stop.
    Stop,
}

/// Why [`run`] returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The stream ended; the caller may reconnect.
    Ended,
    /// Credentials were rejected; reconnecting is pointless.
    InvalidAuth,
    /// Shutdown was requested.
    Cancelled,
}

fn parse_command(body: &str) -> Command {
    if body.contains("slap users") {
        Command::Slap
    } else if body.contains("bother users") {
        Command::Bother
    } else if body.contains("who is late") {
        Command::WhoIsLate
    } else {
        Command::Help
    }
}

fn parse_casual(body: &str) -> Option<Casual> {
    if body.contains("hello") {
        Some(Casual::Hello)
    } else if body.contains("status") {
        Some(Casual::Status)
    } else if body.contains("ping") {
        Some(Casual::Ping)
    } else {
        None
    }
}

fn has_word(text: &str, word: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .any(|w| w.eq_ignore_ascii_case(word))
}

fn roll(probability: f64) -> bool {
    probability > 0.0 && rand::rng().random::<f64>() < probability
}

/// Classify `msg`.
///
/// If the sender is flagged, their violator entry is removed here, so a
/// user is scolded at most once per rebuild even if messages race.
pub fn classify(ctx: &BotContext, msg: &MessageEvent) -> Route {
    if msg.sender.is_empty() || msg.sender == ctx.bot_id {
        return Route::Ignore;
    }

    if let Some(external_id) = ctx.violators.take(&msg.sender) {
        return Route::Violator { external_id };
    }

    let mention = ctx.bot_mention();
    let trimmed = msg.text.trim_start();
    if let Some(rest) = trimmed.strip_prefix(mention.as_str()) {
        let body = rest.trim_start_matches(':').trim().to_lowercase();
        if ctx.privileged.is_privileged(&msg.sender, &ctx.directory) {
            return Route::Command(parse_command(&body));
        }
        return parse_casual(&body).map_or(Route::Ignore, Route::Casual);
    }

    if has_word(&msg.text, "tick") {
        return Route::Tock;
    }
    if msg.text.contains(mention.as_str()) && roll(ctx.settings.dispatch.easter_egg_probability) {
        return Route::Mention;
    }
    Route::Ignore
}

/// Classify and answer one message.
#[instrument(skip_all, fields(sender = %msg.sender, channel = %msg.channel))]
pub async fn handle_message(ctx: &Arc<BotContext>, msg: MessageEvent) {
    let route = classify(ctx, &msg);
    debug!(?route, "message classified");

    let MessageEvent {
        sender, channel, ..
    } = msg;

    match route {
        Route::Ignore => {}
        Route::Violator { external_id } => {
            let job = Arc::clone(ctx);
            drop(ctx.spawn(async move {
                notifier::answer_violator(&job, &sender, &channel, &external_id).await;
            }));
        }
        Route::Command(Command::Slap) => {
            let job = Arc::clone(ctx);
            drop(ctx.spawn(async move {
                if let Err(e) = notifier::slap_late_users(&job).await {
                    warn!(error = %e, category = %e.category(), "slap failed");
                }
            }));
            let _ = reply(ctx, &channel, SLAP_ACK).await;
        }
        Route::Command(Command::Bother) => {
            let job = Arc::clone(ctx);
            drop(ctx.spawn(async move {
                if let Err(e) = start_nag_cycle(&job).await {
                    warn!(error = %e, category = %e.category(), "nag cycle failed");
                }
            }));
            let _ = reply(ctx, &channel, BOTHER_ACK).await;
        }
        Route::Command(Command::WhoIsLate) => {
            let job = Arc::clone(ctx);
            drop(ctx.spawn(async move {
                notifier::report_roster(&job, &channel).await;
            }));
        }
        Route::Command(Command::Help) => {
            let _ = reply(ctx, &channel, &help_text(&ctx.bot_id)).await;
        }
        Route::Casual(Casual::Hello) | Route::Mention => {
            let _ = reply(ctx, &channel, &ctx.messages.nice(&sender)).await;
        }
        Route::Casual(Casual::Status) => {
            let job = Arc::clone(ctx);
            drop(ctx.spawn(async move {
                notifier::report_status(&job, &sender, &channel).await;
            }));
        }
        Route::Casual(Casual::Ping) => {
            let _ = reply(ctx, &channel, PONG).await;
        }
        Route::Tock => {
            let _ = reply(ctx, &channel, TOCK).await;
        }
    }
}

/// Handle one event of any kind.
pub async fn handle_event(ctx: &Arc<BotContext>, event: ChatEvent) -> Flow {
    match event {
        ChatEvent::Message(msg) => handle_message(ctx, msg).await,
        ChatEvent::Hello => debug!("server hello"),
        ChatEvent::Connected => info!("event stream connected"),
        ChatEvent::Presence { user, presence } => debug!(%user, %presence, "presence change"),
        ChatEvent::Latency { rtt_ms } => debug!(rtt_ms, "keepalive"),
        ChatEvent::Error { code, message } => warn!(code, %message, "chat error event"),
        ChatEvent::InvalidAuth => {
            error!("chat credentials rejected");
            return Flow::Stop;
        }
    }
    Flow::Continue
}

/// Drain `events` until it ends, auth fails, or shutdown.
#[instrument(skip_all)]
pub async fn run(ctx: Arc<BotContext>, mut events: EventStream) -> RunOutcome {
    loop {
        tokio::select! {
            next = events.next() => {
                let Some(event) = next else {
                    info!("event stream ended");
                    return RunOutcome::Ended;
                };
                if handle_event(&ctx, event).await == Flow::Stop {
                    return RunOutcome::InvalidAuth;
                }
            }
            () = ctx.cancel.cancelled() => return RunOutcome::Cancelled,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
