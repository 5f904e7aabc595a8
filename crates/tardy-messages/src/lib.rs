//! # tardy-messages
//!
//! Canned texts the bot sends, grouped into three [`Category`]s:
//!
//! - **angry**: scolding a known violator, addressed with `<@{user}>`
//! - **nice**: friendly replies, addressed with `<@{user}>`
//! - **reminder**: broadcast direct messages, never addressed
//!
//! A built-in set is compiled in; a JSON file with the same shape can
//! replace it.

#![deny(unsafe_code)]

pub mod errors;
pub mod repository;

pub use errors::{MessagesError, Result};
pub use repository::{Category, MessageRepository, USER_FILLER};
