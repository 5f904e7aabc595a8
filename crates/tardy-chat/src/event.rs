//! Inbound chat events.
//!
//! RTM frames are JSON objects tagged by `type`. Only the handful the bot
//! cares about become [`ChatEvent`]s; unknown types and malformed frames are
//! dropped at decode time.

use std::pin::Pin;

use futures::Stream;
use serde::Deserialize;
use tardy_core::{ChannelId, ChatId};
use tracing::debug;

/// Live inbound event stream.
pub type EventStream = Pin<Box<dyn Stream<Item = ChatEvent> + Send>>;

/// A user message in some conversation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    /// Author. Empty for system and integration messages.
    pub sender: ChatId,
    /// Conversation the message was posted in; replies go here.
    pub channel: ChannelId,
    /// Raw text, mentions encoded as `<@U123>`.
    pub text: String,
}

/// Everything the event loop can receive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatEvent {
    /// Server greeting after the websocket opens.
    Hello,
    /// Websocket handshake completed.
    Connected,
    /// A user message.
    Message(MessageEvent),
    /// A user's presence changed.
    Presence {
        /// Whose presence.
        user: ChatId,
        /// `active` or `away`.
        presence: String,
    },
    /// Round trip of a keepalive ping.
    Latency {
        /// Milliseconds between ping and pong.
        rtt_ms: u64,
    },
    /// Server-reported or transport error. The stream may end after it.
    Error {
        /// Platform error code, 0 for transport errors.
        code: i64,
        /// Human-readable description.
        message: String,
    },
    /// Credentials rejected; the stream ends and reconnecting cannot help.
    InvalidAuth,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Frame {
    Hello,
    Message {
        #[serde(default)]
        user: String,
        #[serde(default)]
        channel: String,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        subtype: Option<String>,
    },
    PresenceChange {
        user: String,
        presence: String,
    },
    Pong {
        #[serde(default)]
        time: Option<u64>,
    },
    Error {
        error: FrameError,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Deserialize)]
struct FrameError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
}

/// Subtypes that describe edits to earlier messages rather than new text.
const IGNORED_SUBTYPES: &[&str] = &["message_changed", "message_deleted", "message_replied"];

/// Decode one RTM text frame. `now_ms` is the receive time, used to turn a
/// pong into a round-trip latency.
pub fn decode_frame(raw: &str, now_ms: u64) -> Option<ChatEvent> {
    let frame: Frame = match serde_json::from_str(raw) {
        Ok(frame) => frame,
        Err(e) => {
            debug!(error = %e, "dropping malformed frame");
            return None;
        }
    };

    match frame {
        Frame::Hello => Some(ChatEvent::Hello),
        Frame::Message {
            user,
            channel,
            text,
            subtype,
        } => {
            if subtype.as_deref().is_some_and(|s| IGNORED_SUBTYPES.contains(&s)) {
                return None;
            }
            Some(ChatEvent::Message(MessageEvent {
                sender: ChatId::from(user),
                channel: ChannelId::from(channel),
                text: text?,
            }))
        }
        Frame::PresenceChange { user, presence } => Some(ChatEvent::Presence {
            user: ChatId::from(user),
            presence,
        }),
        Frame::Pong { time } => Some(ChatEvent::Latency {
            rtt_ms: time.map_or(0, |sent| now_ms.saturating_sub(sent)),
        }),
        Frame::Error { error } => Some(ChatEvent::Error {
            code: error.code,
            message: error.msg,
        }),
        Frame::Unknown => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
