//! Feed-level and domain types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tardy_core::ExternalId;

use crate::errors::{ComplianceError, Result};

/// One reporting period as the feed describes it. Dates are raw strings;
/// [`crate::select_current_period`] parses them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingPeriod {
    /// First day, `YYYY-MM-DD`.
    pub start_date: String,
    /// Last day, `YYYY-MM-DD`.
    #[serde(default)]
    pub end_date: String,
}

impl ReportingPeriod {
    /// Convenience constructor.
    pub fn new(start_date: impl Into<String>, end_date: impl Into<String>) -> Self {
        Self {
            start_date: start_date.into(),
            end_date: end_date.into(),
        }
    }
}

/// Opaque continuation for the next page of results.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageToken(pub String);

/// A user row as returned by the feed. Fields are optional because the feed
/// does not guarantee them; [`ComplianceRecord::from_user`] validates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonCompliantUser {
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Login name.
    #[serde(default)]
    pub username: Option<String>,
    /// Given name.
    #[serde(default)]
    pub first_name: Option<String>,
    /// Family name.
    #[serde(default)]
    pub last_name: Option<String>,
}

impl NonCompliantUser {
    /// Row with only an email set.
    pub fn with_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }
}

/// One page of non-compliant users.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NonCompliantPage {
    /// Rows on this page.
    pub users: Vec<NonCompliantUser>,
    /// Token for the following page; `None` on the last page.
    pub next: Option<PageToken>,
}

/// A user who has not reported for the active period.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComplianceRecord {
    /// Email the feed knows the user by.
    pub external_id: ExternalId,
    /// Start of the period the record belongs to.
    pub period_start: NaiveDate,
    /// Login name, when the feed supplies one.
    pub username: Option<String>,
    /// Given name, when the feed supplies one.
    pub first_name: Option<String>,
    /// Family name, when the feed supplies one.
    pub last_name: Option<String>,
}

impl ComplianceRecord {
    /// Validate a feed row. A missing or blank email is an unparsable record.
    pub fn from_user(user: NonCompliantUser, period_start: NaiveDate) -> Result<Self> {
        let external_id = user
            .email
            .as_deref()
            .map(ExternalId::from)
            .filter(|id| !id.is_empty())
            .ok_or(ComplianceError::MissingField { field: "email" })?;

        Ok(Self {
            external_id,
            period_start,
            username: non_blank(user.username),
            first_name: non_blank(user.first_name),
            last_name: non_blank(user.last_name),
        })
    }

    /// Human-readable name for logs: full name, else login, else email.
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(name), None) | (None, Some(name)) => name.clone(),
            (None, None) => self
                .username
                .clone()
                .unwrap_or_else(|| self.external_id.to_string()),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 7).unwrap()
    }

    #[test]
    fn record_from_valid_user() {
        let user = NonCompliantUser {
            email: Some("A@X.org".into()),
            username: Some("a".into()),
            ..NonCompliantUser::default()
        };
        let record = ComplianceRecord::from_user(user, day()).unwrap();
        assert_eq!(record.external_id.as_str(), "a@x.org");
        assert_eq!(record.period_start, day());
        assert_eq!(record.username.as_deref(), Some("a"));
    }

    #[test]
    fn record_keeps_names_from_feed() {
        let user: NonCompliantUser = serde_json::from_str(
            r#"{"id": 1, "username": "a", "first_name": "Ada", "last_name": " Lovelace ", "email": "a@x.org"}"#,
        )
        .unwrap();
        let record = ComplianceRecord::from_user(user, day()).unwrap();
        assert_eq!(record.first_name.as_deref(), Some("Ada"));
        assert_eq!(record.last_name.as_deref(), Some("Lovelace"));
        assert_eq!(record.display_name(), "Ada Lovelace");
    }

    #[test]
    fn display_name_falls_back_to_login_then_email() {
        let mut record = ComplianceRecord::from_user(
            NonCompliantUser {
                email: Some("a@x.org".into()),
                username: Some("a".into()),
                first_name: Some("".into()),
                ..NonCompliantUser::default()
            },
            day(),
        )
        .unwrap();
        assert!(record.first_name.is_none());
        assert_eq!(record.display_name(), "a");

        record.username = None;
        assert_eq!(record.display_name(), "a@x.org");
    }

    #[test]
    fn record_without_email_rejected() {
        let err = ComplianceRecord::from_user(NonCompliantUser::default(), day()).unwrap_err();
        assert!(matches!(err, ComplianceError::MissingField { field: "email" }));
    }

    #[test]
    fn record_with_blank_email_rejected() {
        let err = ComplianceRecord::from_user(NonCompliantUser::with_email("  "), day());
        assert!(err.is_err());
    }

    #[test]
    fn user_row_tolerates_missing_fields() {
        let user: NonCompliantUser = serde_json::from_str(r#"{"id": 3, "email": null}"#).unwrap();
        assert!(user.email.is_none());
    }
}
