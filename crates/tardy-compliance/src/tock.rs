//! HTTP implementation of [`ComplianceFeed`] against the Tock audit API.
//!
//! - `GET {base}/api/reporting_period_audit/` lists reporting periods
//! - `GET {base}/api/reporting_period_audit/{YYYY-MM-DD}/` lists users who
//!   have not reported for that period
//!
//! Both return the paged envelope `{count, next, previous, results}`. For
//! user pages the `next` URL is handed back verbatim as the [`PageToken`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::errors::{ComplianceError, Result};
use crate::feed::ComplianceFeed;
use crate::types::{NonCompliantPage, NonCompliantUser, PageToken, ReportingPeriod};

const AUDIT_PATH: &str = "/api/reporting_period_audit/";
const USER_AGENT: &str = concat!("tardy-bot/", env!("CARGO_PKG_VERSION"));

/// Paged envelope shared by every audit endpoint.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    next: Option<String>,
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

/// Tock audit API client.
#[derive(Clone, Debug)]
pub struct TockClient {
    client: reqwest::Client,
    audit_url: String,
    token: String,
}

impl TockClient {
    /// Create a client for the Tock instance at `base_url`.
    pub fn new(base_url: &str, token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            audit_url: format!("{}{AUDIT_PATH}", base_url.trim_end_matches('/')),
            token: token.into(),
        })
    }

    /// URL of the period audit listing.
    pub fn audit_url(&self) -> &str {
        &self.audit_url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Token {}", self.token))
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ComplianceError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ComplianceError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ComplianceFeed for TockClient {
    #[instrument(skip(self), fields(url = %self.audit_url))]
    async fn list_periods(&self) -> Result<Vec<ReportingPeriod>> {
        // the listing is newest first and the active period is always on
        // the first page
        let envelope: Envelope<ReportingPeriod> = self.get_json(&self.audit_url).await?;
        debug!(count = envelope.results.len(), "reporting periods fetched");
        Ok(envelope.results)
    }

    #[instrument(skip(self, page), fields(period = %period_start))]
    async fn list_non_compliant(
        &self,
        period_start: NaiveDate,
        page: Option<&PageToken>,
    ) -> Result<NonCompliantPage> {
        let url = match page {
            Some(token) => token.0.clone(),
            None => format!("{}{}/", self.audit_url, period_start.format("%Y-%m-%d")),
        };
        let envelope: Envelope<NonCompliantUser> = self.get_json(&url).await?;
        Ok(NonCompliantPage {
            users: envelope.results,
            next: envelope.next.filter(|n| !n.is_empty()).map(PageToken),
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(server: &MockServer) -> TockClient {
        TockClient::new(&server.uri(), "secret", Duration::from_secs(5)).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2014, 1, 7).unwrap()
    }

    #[test]
    fn audit_url_tolerates_trailing_slash() {
        let c = TockClient::new("https://tock.example/", "t", Duration::from_secs(1)).unwrap();
        assert_eq!(c.audit_url(), "https://tock.example/api/reporting_period_audit/");
    }

    #[tokio::test]
    async fn lists_periods_with_token_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/reporting_period_audit/"))
            .and(header("authorization", "Token secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 2,
                "next": null,
                "previous": null,
                "results": [
                    {"start_date": "2014-01-07", "end_date": "2014-01-12", "working_hours": 40},
                    {"start_date": "2014-01-01", "end_date": "2014-01-05", "working_hours": 40}
                ]
            })))
            .mount(&server)
            .await;

        let periods = client(&server).list_periods().await.unwrap();
        assert_eq!(periods.len(), 2);
        assert_eq!(periods[0], ReportingPeriod::new("2014-01-07", "2014-01-12"));
    }

    #[tokio::test]
    async fn fetches_users_and_follows_next_url() {
        let server = MockServer::start().await;
        let next = format!("{}/api/reporting_period_audit/2014-01-07/?page=2", server.uri());
        Mock::given(method("GET"))
            .and(path("/api/reporting_period_audit/2014-01-07/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 3,
                "next": next,
                "previous": null,
                "results": [
                    {"id": 1, "username": "a", "first_name": "A", "last_name": "Z", "email": "a@x.org"},
                    {"id": 2, "username": "b", "first_name": "B", "last_name": "Y", "email": "b@x.org"}
                ]
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        let c = client(&server);
        let first = c.list_non_compliant(day(), None).await.unwrap();
        assert_eq!(first.users.len(), 2);
        assert_eq!(first.users[0].email.as_deref(), Some("a@x.org"));
        assert_eq!(first.users[1].first_name.as_deref(), Some("B"));
        assert_eq!(first.users[1].last_name.as_deref(), Some("Y"));
        let token = first.next.clone().unwrap();
        assert_eq!(token.0, next);

        server.reset().await;
        Mock::given(method("GET"))
            .and(path("/api/reporting_period_audit/2014-01-07/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 3,
                "next": null,
                "previous": null,
                "results": [{"id": 3, "username": "c", "email": "c@x.org"}]
            })))
            .mount(&server)
            .await;

        let second = c.list_non_compliant(day(), Some(&token)).await.unwrap();
        assert_eq!(second.users.len(), 1);
        assert!(second.next.is_none());
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let err = client(&server).list_periods().await.unwrap_err();
        assert_matches!(err, ComplianceError::Status { status: 401, .. });
    }

    #[tokio::test]
    async fn malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client(&server).list_non_compliant(day(), None).await.unwrap_err();
        assert_matches!(err, ComplianceError::Decode(_));
    }
}
