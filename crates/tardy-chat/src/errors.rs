//! Chat platform errors.

use tardy_core::{Categorized, ErrorCategory};
use thiserror::Error;

/// Errors talking to the chat platform.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Transport failure (connect, timeout, body read).
    #[error("chat request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("chat API `{method}` returned HTTP {status}")]
    Status {
        /// API method name, e.g. `users.list`.
        method: String,
        /// HTTP status code.
        status: u16,
    },

    /// The API answered `ok: false`.
    #[error("chat API `{method}` failed: {error}")]
    Api {
        /// API method name.
        method: String,
        /// Platform error code, e.g. `channel_not_found`.
        error: String,
    },

    /// The token was rejected. Retrying cannot help.
    #[error("chat token rejected ({0})")]
    InvalidAuth(String),

    /// A response was not the expected shape.
    #[error("malformed chat response: {0}")]
    Decode(String),

    /// Websocket handshake or transport failure.
    #[error("chat websocket error: {0}")]
    WebSocket(String),
}

impl ChatError {
    /// Map an `ok: false` error code, recognizing auth failures.
    pub(crate) fn from_api(method: &str, error: String) -> Self {
        match error.as_str() {
            "invalid_auth" | "not_authed" | "account_inactive" | "token_revoked" => {
                Self::InvalidAuth(error)
            }
            _ => Self::Api {
                method: method.to_string(),
                error,
            },
        }
    }

    fn is_send_method(method: &str) -> bool {
        method.starts_with("chat.") || method.starts_with("conversations.")
    }
}

impl Categorized for ChatError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidAuth(_) => ErrorCategory::Configuration,
            Self::Decode(_) => ErrorCategory::UnparsableRecord,
            Self::Api { method, .. } | Self::Status { method, .. }
                if Self::is_send_method(method) =>
            {
                ErrorCategory::SendFailure
            }
            Self::Http(_) | Self::Status { .. } | Self::Api { .. } | Self::WebSocket(_) => {
                ErrorCategory::TransientFetch
            }
        }
    }
}

/// Result type for chat operations.
pub type Result<T> = std::result::Result<T, ChatError>;
