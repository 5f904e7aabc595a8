//! Settings error types.

use tardy_core::{Categorized, ErrorCategory};
use thiserror::Error;

/// Errors that can occur when loading or validating settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to read the settings file from disk.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse JSON in the settings file.
    #[error("failed to parse settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A required credential or endpoint is not configured.
    #[error("missing required setting `{key}` (set {env})")]
    MissingRequired {
        /// Dotted settings key.
        key: &'static str,
        /// Environment variable that can supply it.
        env: &'static str,
    },
    /// A settings value was invalid (e.g., out of range).
    #[error("invalid settings value: {0}")]
    InvalidValue(String),
}

impl Categorized for SettingsError {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_required_display() {
        let err = SettingsError::MissingRequired {
            key: "chat.token",
            env: "SLACK_KEY",
        };
        assert_eq!(
            err.to_string(),
            "missing required setting `chat.token` (set SLACK_KEY)"
        );
    }

    #[test]
    fn json_error_from_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{bad}").unwrap_err();
        let err: SettingsError = json_err.into();
        assert!(matches!(err, SettingsError::Json(_)));
    }

    #[test]
    fn every_settings_error_is_configuration() {
        let err = SettingsError::InvalidValue("x".into());
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(err.category().is_fatal());
    }
}
