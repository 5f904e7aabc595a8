//! # tardy-state
//!
//! The only shared mutable resources in the bot. Each structure has exactly
//! one lock; no operation ever holds two of them, and no lock is held across
//! I/O or an `.await` (the `parking_lot` guards are `!Send`).
//!
//! - [`DirectoryCache`]: email → chat id, replaced wholesale on refresh
//! - [`ViolatorSet`]: chat id → email, consume-once, generation-tagged
//! - [`PrivilegedUsers`]: admin identities, resolved from email to chat id in place

#![deny(unsafe_code)]

pub mod directory;
pub mod privileged;
pub mod violators;

pub use directory::{DirectoryCache, DirectoryMap};
pub use privileged::PrivilegedUsers;
pub use violators::{Generation, ViolatorMap, ViolatorSet};
