//! # tardy-core
//!
//! Foundation types shared by every tardy crate:
//!
//! - **Branded IDs**: [`ExternalId`] (compliance-feed identity, an email),
//!   [`ChatId`] (chat-platform user) and [`ChannelId`] as newtypes
//! - **Errors**: the [`ErrorCategory`] taxonomy each crate error maps into
//! - **Logging**: [`logging::init_subscriber`] for the global `tracing` subscriber
//! - **Backoff**: [`retry::backoff_delay`] for reconnect loops

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod logging;
pub mod retry;

pub use errors::{Categorized, ErrorCategory};
pub use ids::{ChannelId, ChatId, ExternalId};
