//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`TardySettings::default()`]
//! 2. If the settings file exists, deep-merge its values over defaults
//! 3. Apply environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::{INTERVAL_SECS, NAG_WINDOW_SECS, PrivilegedList, TardySettings};

/// Resolve the default settings path (`~/.tardy/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".tardy").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<TardySettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults (plus env). If the file
/// contains invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<TardySettings> {
    let mut settings = load_file_layer(path)?;
    apply_overrides(&mut settings, |name| std::env::var(name).ok());
    Ok(settings)
}

fn load_file_layer(path: &Path) -> Result<TardySettings> {
    let defaults = serde_json::to_value(TardySettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply overrides read through `lookup` (normally `std::env::var`).
///
/// `TARDY_*` names win over the legacy deployment names. Values that fail to
/// parse or fall outside their range are ignored with a warning.
pub fn apply_overrides(settings: &mut TardySettings, lookup: impl Fn(&str) -> Option<String>) {
    let env = Env { lookup: &lookup };

    // ── Chat ────────────────────────────────────────────────────────
    if let Some(v) = env.string(&["TARDY_SLACK_TOKEN", "SLACK_KEY"]) {
        settings.chat.token = v;
    }
    if let Some(v) = env.string(&["TARDY_SLACK_API_URL"]) {
        settings.chat.api_base_url = v;
    }

    // ── Compliance ──────────────────────────────────────────────────
    if let Some(v) = env.string(&["TARDY_TOCK_URL", "TOCK_URL"]) {
        settings.compliance.base_url = v;
    }
    if let Some(v) = env.string(&["TARDY_TOCK_TOKEN", "TOCK_API_TOKEN"]) {
        settings.compliance.token = v;
    }
    if let Some(v) = env.string(&["TARDY_PRIVILEGED", "MASTER_LIST"]) {
        settings.privileged = PrivilegedList::parse(&v);
    }

    // ── Schedule ────────────────────────────────────────────────────
    if let Some(v) = env.u64("TARDY_NAG_WINDOW_SECS", NAG_WINDOW_SECS) {
        settings.schedule.nag_window_secs = v;
    }
    if let Some(v) = env.u64("TARDY_REFRESH_INTERVAL_SECS", INTERVAL_SECS) {
        settings.schedule.refresh_interval_secs = v;
    }
    if let Some(v) = env.u64("TARDY_AUTO_NAG_INTERVAL_SECS", INTERVAL_SECS) {
        settings.schedule.auto_nag_interval_secs = Some(v);
    }

    // ── Dispatch / messages ─────────────────────────────────────────
    if let Some(v) = env.probability("TARDY_EASTER_EGG_PROBABILITY") {
        settings.dispatch.easter_egg_probability = v;
    }
    if let Some(v) = env.string(&["TARDY_MESSAGES_PATH"]) {
        settings.messages.path = Some(v);
    }

    // ── Server / logging ────────────────────────────────────────────
    if let Some(v) = env.string(&["TARDY_HOST"]) {
        settings.server.host = v;
    }
    if let Some(v) = env.u16(&["TARDY_PORT", "PORT"], 1, 65535) {
        settings.server.port = v;
    }
    if let Some(v) = env.string(&["TARDY_LOG_LEVEL"]) {
        settings.logging.level = v;
    }
    if let Some(v) = env.bool("TARDY_LOG_JSON") {
        settings.logging.json = v;
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a probability in `0.0..=1.0`.
pub fn parse_probability(val: &str) -> Option<f64> {
    let p: f64 = val.parse().ok()?;
    (0.0..=1.0).contains(&p).then_some(p)
}

// ── Lookup wrappers ─────────────────────────────────────────────────────────

struct Env<'a, F: Fn(&str) -> Option<String>> {
    lookup: &'a F,
}

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    fn raw(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn string(&self, names: &[&str]) -> Option<String> {
        names.iter().find_map(|name| self.raw(name))
    }

    fn bool(&self, name: &str) -> Option<bool> {
        let val = self.raw(name)?;
        let result = parse_bool(&val);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
        }
        result
    }

    fn u16(&self, names: &[&str], min: u16, max: u16) -> Option<u16> {
        names.iter().find_map(|name| {
            let val = self.raw(name)?;
            let result = parse_u16_range(&val, min, max);
            if result.is_none() {
                tracing::warn!(key = name, value = %val, "invalid u16 env var, ignoring");
            }
            result
        })
    }

    fn u64(&self, name: &str, range: RangeInclusive<u64>) -> Option<u64> {
        let val = self.raw(name)?;
        let result = parse_u64_range(&val, *range.start(), *range.end());
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
        }
        result
    }

    fn probability(&self, name: &str) -> Option<f64> {
        let val = self.raw(name)?;
        let result = parse_probability(&val);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid probability env var, ignoring");
        }
        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
