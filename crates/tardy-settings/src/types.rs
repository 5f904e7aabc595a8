//! Settings types.
//!
//! JSON keys are camelCase; every struct uses `#[serde(default)]` so a
//! settings file only needs the keys it overrides.

use std::ops::RangeInclusive;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TardySettings {
    /// Chat platform connection.
    pub chat: ChatSettings,
    /// Compliance feed connection.
    pub compliance: ComplianceSettings,
    /// Identities allowed to issue admin commands (emails or chat ids).
    pub privileged: PrivilegedList,
    /// Job timing.
    pub schedule: ScheduleSettings,
    /// Event dispatch tuning.
    pub dispatch: DispatchSettings,
    /// Message template source.
    pub messages: MessageSettings,
    /// Health endpoint.
    pub server: ServerSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl TardySettings {
    /// Check that every credential and endpoint needed to start is present.
    pub fn validate(&self) -> Result<()> {
        if self.chat.token.trim().is_empty() {
            return Err(SettingsError::MissingRequired {
                key: "chat.token",
                env: "SLACK_KEY",
            });
        }
        if self.compliance.base_url.trim().is_empty() {
            return Err(SettingsError::MissingRequired {
                key: "compliance.baseUrl",
                env: "TOCK_URL",
            });
        }
        if self.compliance.token.trim().is_empty() {
            return Err(SettingsError::MissingRequired {
                key: "compliance.token",
                env: "TOCK_API_TOKEN",
            });
        }
        if !(0.0..=1.0).contains(&self.dispatch.easter_egg_probability) {
            return Err(SettingsError::InvalidValue(format!(
                "dispatch.easterEggProbability must be within 0..=1, got {}",
                self.dispatch.easter_egg_probability
            )));
        }
        let schedule = &self.schedule;
        check_secs("schedule.nagWindowSecs", schedule.nag_window_secs, NAG_WINDOW_SECS)?;
        check_secs(
            "schedule.refreshIntervalSecs",
            schedule.refresh_interval_secs,
            INTERVAL_SECS,
        )?;
        if let Some(secs) = schedule.auto_nag_interval_secs {
            check_secs("schedule.autoNagIntervalSecs", secs, INTERVAL_SECS)?;
        }
        Ok(())
    }
}

/// Accepted range for `schedule.nagWindowSecs`: one minute to one week.
pub const NAG_WINDOW_SECS: RangeInclusive<u64> = 60..=7 * 24 * 3600;
/// Accepted range for the refresh and auto-nag intervals: one minute to 30 days.
pub const INTERVAL_SECS: RangeInclusive<u64> = 60..=30 * 24 * 3600;

fn check_secs(key: &str, value: u64, range: RangeInclusive<u64>) -> Result<()> {
    if range.contains(&value) {
        return Ok(());
    }
    Err(SettingsError::InvalidValue(format!(
        "{key} must be within {}..={} seconds, got {value}",
        range.start(),
        range.end()
    )))
}

/// Chat platform settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatSettings {
    /// Bot token.
    pub token: String,
    /// Web API base URL.
    pub api_base_url: String,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base_url: "https://slack.com/api".to_string(),
            request_timeout_ms: 30_000,
        }
    }
}

/// Compliance feed settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComplianceSettings {
    /// Feed base URL (the audit API path is appended).
    pub base_url: String,
    /// API token.
    pub token: String,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for ComplianceSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: String::new(),
            request_timeout_ms: 30_000,
        }
    }
}

/// Ordered list of privileged identities.
///
/// Deserializes from either a JSON array or a comma-separated string, so the
/// same value works in the settings file and in `MASTER_LIST`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PrivilegedList(pub Vec<String>);

impl PrivilegedList {
    /// Parse a comma-separated list, dropping blank entries.
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }
}

impl<'de> Deserialize<'de> for PrivilegedList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Csv(String),
            List(Vec<String>),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Csv(s) => Self::parse(&s),
            Raw::List(items) => Self::parse(&items.join(",")),
        })
    }
}

/// Job timing.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleSettings {
    /// How long a computed violator set stays valid.
    pub nag_window_secs: u64,
    /// Interval between directory refreshes.
    pub refresh_interval_secs: u64,
    /// If set, start a nag cycle on this interval without an admin command.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_nag_interval_secs: Option<u64>,
}

impl ScheduleSettings {
    /// Nag window as a [`Duration`].
    pub fn nag_window(&self) -> Duration {
        Duration::from_secs(self.nag_window_secs)
    }

    /// Directory refresh interval as a [`Duration`].
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Automatic nag interval, if enabled.
    pub fn auto_nag_interval(&self) -> Option<Duration> {
        self.auto_nag_interval_secs.map(Duration::from_secs)
    }
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            nag_window_secs: 4 * 60 * 60,
            refresh_interval_secs: 7 * 24 * 60 * 60,
            auto_nag_interval_secs: None,
        }
    }
}

/// Event dispatch tuning.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DispatchSettings {
    /// Chance (0..=1) of answering an indirect bot mention.
    pub easter_egg_probability: f64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            easter_egg_probability: 0.3,
        }
    }
}

/// Message template source.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageSettings {
    /// Template file replacing the built-in set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Health endpoint settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Log output settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
