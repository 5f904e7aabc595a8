//! # tardy-runtime
//!
//! The moving parts of the bot, wired over a shared [`BotContext`]:
//!
//! - [`refresher`]: rebuilds the email → chat id directory from the member list
//! - [`nag`]: joins late users against the directory into the violator set and
//!   expires it after the nag window
//! - [`dispatcher`]: classifies each inbound message and answers it
//! - [`notifier`]: outbound texts and the reminder blast
//! - `testing` (feature-gated): in-memory chat and feed fakes

#![deny(unsafe_code)]

pub mod context;
pub mod dispatcher;
pub mod nag;
pub mod notifier;
pub mod refresher;
#[cfg(feature = "testing")]
pub mod testing;

pub use context::BotContext;
pub use dispatcher::{Route, RunOutcome, classify, handle_event, run};
pub use nag::{rebuild, start_nag_cycle};
pub use notifier::slap_late_users;
pub use refresher::refresh_directory;
