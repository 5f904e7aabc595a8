//! Domain-level access to the compliance feed.
//!
//! [`ComplianceSource`] hides pagination and period selection: callers ask
//! for "who is late today" and get a stream or list of validated records.

use std::pin::Pin;
use std::sync::Arc;

use chrono::NaiveDate;
use futures::{Stream, StreamExt};
use tardy_core::ExternalId;
use tracing::{debug, warn};

use crate::errors::{ComplianceError, Result};
use crate::feed::ComplianceFeed;
use crate::period::select_current_period;
use crate::types::{ComplianceRecord, PageToken};

/// Upper bound on pages drained per query. A feed that keeps handing out
/// continuation tokens past it yields [`ComplianceError::PageLimit`].
pub const MAX_PAGES: usize = 500;

/// Stream of late users for one period.
pub type RecordStream = Pin<Box<dyn Stream<Item = Result<ComplianceRecord>> + Send>>;

/// Queries the feed for non-compliant users.
#[derive(Clone)]
pub struct ComplianceSource {
    feed: Arc<dyn ComplianceFeed>,
}

impl ComplianceSource {
    /// Wrap a feed.
    pub fn new(feed: Arc<dyn ComplianceFeed>) -> Self {
        Self { feed }
    }

    /// Start date of the period active on `today`.
    pub async fn current_period(&self, today: NaiveDate) -> Result<NaiveDate> {
        let periods = self.feed.list_periods().await?;
        let start = select_current_period(&periods, today)?;
        debug!(%start, periods = periods.len(), "reporting period selected");
        Ok(start)
    }

    /// Stream every late user for `period_start`, following pagination.
    ///
    /// Rows without a usable email are logged and skipped. A fetch failure,
    /// or running past [`MAX_PAGES`], is yielded once and ends the stream.
    pub fn records(&self, period_start: NaiveDate) -> RecordStream {
        let feed = Arc::clone(&self.feed);
        Box::pin(async_stream::stream! {
            let mut token: Option<PageToken> = None;
            for page_no in 0..MAX_PAGES {
                let page = match feed.list_non_compliant(period_start, token.as_ref()).await {
                    Ok(page) => page,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };
                debug!(page = page_no, rows = page.users.len(), "non-compliant page fetched");

                for user in page.users {
                    match ComplianceRecord::from_user(user, period_start) {
                        Ok(record) => yield Ok(record),
                        Err(e) => warn!(error = %e, "skipping compliance row"),
                    }
                }

                match page.next {
                    Some(next) => token = Some(next),
                    None => return,
                }
            }
            warn!(max_pages = MAX_PAGES, "compliance pagination limit reached");
            yield Err(ComplianceError::PageLimit { pages: MAX_PAGES });
        })
    }

    /// All users late for the period active on `today`.
    pub async fn non_compliant(&self, today: NaiveDate) -> Result<Vec<ComplianceRecord>> {
        let period = self.current_period(today).await?;
        let mut stream = self.records(period);
        let mut out = Vec::new();
        while let Some(record) = stream.next().await {
            out.push(record?);
        }
        Ok(out)
    }

    /// [`Self::non_compliant`] for the local calendar date.
    pub async fn non_compliant_now(&self) -> Result<Vec<ComplianceRecord>> {
        self.non_compliant(chrono::Local::now().date_naive()).await
    }

    /// Whether `external_id` is still late right now.
    ///
    /// Stops reading pages as soon as the user is found.
    pub async fn is_non_compliant(&self, external_id: &ExternalId) -> Result<bool> {
        let period = self.current_period(chrono::Local::now().date_naive()).await?;
        let mut stream = self.records(period);
        while let Some(record) = stream.next().await {
            if record?.external_id == *external_id {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl std::fmt::Debug for ComplianceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComplianceSource").finish_non_exhaustive()
    }
}
