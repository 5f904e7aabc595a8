//! # tardy-chat
//!
//! Everything the bot needs from the chat platform.
//!
//! - [`ChatPlatform`]: member listing, self identity and outbound messages
//! - [`EventSource`] / [`ChatEvent`]: the live inbound stream as a closed enum
//! - [`SlackClient`]: Web API implementation (bearer token, JSON over HTTPS)
//! - [`RtmEventSource`]: real-time websocket feed built on `rtm.connect`

#![deny(unsafe_code)]

pub mod errors;
pub mod event;
pub mod platform;
pub mod rtm;
pub mod slack;

pub use errors::{ChatError, Result};
pub use event::{ChatEvent, EventStream, MessageEvent, decode_frame};
pub use platform::{ChatMember, ChatPlatform, EventSource};
pub use rtm::RtmEventSource;
pub use slack::SlackClient;
