//! Template loading errors.

use std::path::PathBuf;

use tardy_core::{Categorized, ErrorCategory};
use thiserror::Error;

use crate::repository::Category;

/// Errors loading or validating message templates.
#[derive(Debug, Error)]
pub enum MessagesError {
    /// Template file could not be read.
    #[error("failed to read templates from {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Template file is not valid JSON of the expected shape.
    #[error("invalid template JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A category has no templates.
    #[error("no `{0}` templates configured")]
    Empty(Category),

    /// A template does not fit its category's filler rule.
    #[error("`{category}` template {index} {problem}")]
    BadTemplate {
        /// Offending category.
        category: Category,
        /// Zero-based position in the list.
        index: usize,
        /// What is wrong with it.
        problem: &'static str,
    },
}

impl Categorized for MessagesError {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

/// Result type for template operations.
pub type Result<T> = std::result::Result<T, MessagesError>;
