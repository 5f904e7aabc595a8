//! The compliance feed contract.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::Result;
use crate::types::{NonCompliantPage, PageToken, ReportingPeriod};

/// Remote source of reporting periods and late users.
#[async_trait]
pub trait ComplianceFeed: Send + Sync {
    /// All reporting periods the feed knows about, in any order.
    async fn list_periods(&self) -> Result<Vec<ReportingPeriod>>;

    /// One page of users who have not reported for the period starting on
    /// `period_start`. `page` is `None` for the first page.
    async fn list_non_compliant(
        &self,
        period_start: NaiveDate,
        page: Option<&PageToken>,
    ) -> Result<NonCompliantPage>;
}
