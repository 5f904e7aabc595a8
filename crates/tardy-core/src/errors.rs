//! Error taxonomy shared by every tardy crate.
//!
//! Each crate defines its own [`thiserror`] enum and maps its variants onto
//! an [`ErrorCategory`] through [`Categorized`]. The category decides what a
//! caller does with the failure:
//!
//! | Category | Handling |
//! |---|---|
//! | [`ErrorCategory::TransientFetch`] | log, abandon this cycle, retry on the next scheduled run |
//! | [`ErrorCategory::UnparsableRecord`] | skip the single record, continue the batch |
//! | [`ErrorCategory::SendFailure`] | log, no retry, no rollback of state mutations |
//! | [`ErrorCategory::Configuration`] | fatal at startup |
//!
//! A compliance record without a directory entry is *not* an error; the
//! builder drops it silently.

use serde::{Deserialize, Serialize};

/// Error category for classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Network or timeout failure against a collaborator.
    TransientFetch,
    /// A single malformed record (bad date, missing field).
    UnparsableRecord,
    /// An outbound chat message could not be delivered.
    SendFailure,
    /// Missing or invalid startup configuration.
    Configuration,
}

impl ErrorCategory {
    /// Whether the operation may succeed if simply run again later.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::TransientFetch | Self::SendFailure)
    }

    /// Whether the process must not continue.
    #[must_use]
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::Configuration)
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TransientFetch => write!(f, "transient_fetch"),
            Self::UnparsableRecord => write!(f, "unparsable_record"),
            Self::SendFailure => write!(f, "send_failure"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}

/// Implemented by every crate-level error enum.
pub trait Categorized {
    /// Classify this error.
    fn category(&self) -> ErrorCategory;
}
