//! # tardy-settings
//!
//! Configuration with layered sources for the tardy bot.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`TardySettings::default()`]
//! 2. **Settings file**: `~/.tardy/settings.json` or an explicit path
//!    (deep-merged over defaults)
//! 3. **Environment variables**: `TARDY_*` plus the legacy deployment names
//!    (`SLACK_KEY`, `TOCK_URL`, `TOCK_API_TOKEN`, `MASTER_LIST`, `PORT`)
//!
//! [`TardySettings::validate`] must pass before the bot starts; a missing
//! credential is a configuration error and the process exits.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{apply_overrides, deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
