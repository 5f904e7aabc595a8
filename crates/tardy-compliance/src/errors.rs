//! Compliance feed errors.

use tardy_core::{Categorized, ErrorCategory};
use thiserror::Error;

/// Errors from the compliance feed or from interpreting its data.
#[derive(Debug, Error)]
pub enum ComplianceError {
    /// Transport failure (connect, timeout, body read).
    #[error("compliance feed request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The feed answered with a non-success status.
    #[error("compliance feed returned HTTP {status} for {url}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// The response body was not the expected shape.
    #[error("malformed compliance response: {0}")]
    Decode(String),

    /// A reporting period date did not parse.
    #[error("unparsable reporting period date `{value}`")]
    InvalidDate {
        /// Raw value from the feed.
        value: String,
    },

    /// A user row lacked a required field.
    #[error("compliance record missing `{field}`")]
    MissingField {
        /// Field name.
        field: &'static str,
    },

    /// The feed returned no reporting periods at all.
    #[error("compliance feed has no reporting periods")]
    NoReportingPeriod,

    /// Pagination did not end within the page limit.
    #[error("compliance feed still paginating after {pages} pages")]
    PageLimit {
        /// Pages read before giving up.
        pages: usize,
    },
}

impl Categorized for ComplianceError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::Http(_) | Self::Status { .. } | Self::NoReportingPeriod | Self::PageLimit { .. } => {
                ErrorCategory::TransientFetch
            }
            Self::Decode(_) | Self::InvalidDate { .. } | Self::MissingField { .. } => {
                ErrorCategory::UnparsableRecord
            }
        }
    }
}

/// Result type for compliance operations.
pub type Result<T> = std::result::Result<T, ComplianceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_transient() {
        let err = ComplianceError::Status {
            status: 503,
            url: "https://tock.example/api".into(),
        };
        assert_eq!(err.category(), ErrorCategory::TransientFetch);
        assert_eq!(
            err.to_string(),
            "compliance feed returned HTTP 503 for https://tock.example/api"
        );
    }

    #[test]
    fn bad_date_is_unparsable_record() {
        let err = ComplianceError::InvalidDate {
            value: "next tuesday".into(),
        };
        assert_eq!(err.category(), ErrorCategory::UnparsableRecord);
        assert!(err.to_string().contains("next tuesday"));
    }

    #[test]
    fn page_limit_is_transient() {
        let err = ComplianceError::PageLimit { pages: 500 };
        assert_eq!(err.category(), ErrorCategory::TransientFetch);
        assert!(err.to_string().contains("500 pages"));
    }

    #[test]
    fn missing_field_is_unparsable_record() {
        let err = ComplianceError::MissingField { field: "email" };
        assert_eq!(err.category(), ErrorCategory::UnparsableRecord);
    }
}
