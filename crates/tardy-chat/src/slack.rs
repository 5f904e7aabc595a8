//! Slack Web API client.
//!
//! Every method is a call to `{api_base}/{method}` with a bearer token.
//! Responses are JSON objects carrying `ok` and, on failure, an `error` code;
//! HTTP 200 with `ok: false` is the usual failure shape.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tardy_core::{ChannelId, ChatId};
use tracing::{debug, instrument};

use crate::errors::{ChatError, Result};
use crate::platform::{ChatMember, ChatPlatform};

const USER_AGENT: &str = concat!("tardy-bot/", env!("CARGO_PKG_VERSION"));
/// Members requested per `users.list` page.
const PAGE_LIMIT: u32 = 200;
/// Upper bound on `users.list` pages per listing.
const MAX_PAGES: usize = 200;

/// Result of `rtm.connect`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RtmSession {
    /// Single-use websocket URL.
    pub url: String,
    /// The bot's own user id.
    pub self_id: ChatId,
}

#[derive(Deserialize)]
struct AuthTest {
    user_id: String,
}

#[derive(Deserialize)]
struct UsersList {
    #[serde(default)]
    members: Vec<RawMember>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Deserialize)]
struct RawMember {
    id: String,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    is_bot: bool,
    #[serde(default)]
    profile: RawProfile,
}

#[derive(Default, Deserialize)]
struct RawProfile {
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct ConversationOpen {
    channel: IdOnly,
}

#[derive(Deserialize)]
struct IdOnly {
    id: String,
}

#[derive(Deserialize)]
struct RtmConnect {
    url: String,
    #[serde(rename = "self")]
    self_: IdOnly,
}

impl From<RawMember> for ChatMember {
    fn from(raw: RawMember) -> Self {
        // USLACKBOT is flagged as a regular user by the API
        let is_bot = raw.is_bot || raw.id == "USLACKBOT";
        Self {
            chat_id: ChatId::from(raw.id),
            email: raw.profile.email.unwrap_or_default(),
            is_bot,
            deleted: raw.deleted,
        }
    }
}

/// Slack Web API client.
pub struct SlackClient {
    client: reqwest::Client,
    api_base: String,
    token: String,
    dm_channels: Mutex<HashMap<ChatId, ChannelId>>,
}

impl SlackClient {
    /// Create a client against `api_base` (normally `https://slack.com/api`).
    pub fn new(api_base: &str, token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.into(),
            dm_channels: Mutex::new(HashMap::new()),
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{method}", self.api_base)
    }

    async fn get<T: DeserializeOwned>(&self, method: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self
            .client
            .get(self.url(method))
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await?;
        Self::unwrap_response(method, response).await
    }

    async fn post<T: DeserializeOwned>(&self, method: &str, body: Value) -> Result<T> {
        let response = self
            .client
            .post(self.url(method))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        Self::unwrap_response(method, response).await
    }

    async fn unwrap_response<T: DeserializeOwned>(
        method: &str,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Status {
                method: method.to_string(),
                status: status.as_u16(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ChatError::Decode(format!("{method}: {e}")))?;

        if !body.get("ok").and_then(Value::as_bool).unwrap_or(false) {
            let error = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error")
                .to_string();
            return Err(ChatError::from_api(method, error));
        }

        serde_json::from_value(body).map_err(|e| ChatError::Decode(format!("{method}: {e}")))
    }

    /// Ask for a real-time messaging websocket URL.
    #[instrument(skip(self))]
    pub async fn rtm_connect(&self) -> Result<RtmSession> {
        let rtm: RtmConnect = self.get("rtm.connect", &[]).await?;
        Ok(RtmSession {
            url: rtm.url,
            self_id: ChatId::from(rtm.self_.id),
        })
    }

    async fn open_direct(&self, user: &ChatId) -> Result<ChannelId> {
        if let Some(channel) = self.dm_channels.lock().get(user) {
            return Ok(channel.clone());
        }
        let opened: ConversationOpen = self
            .post("conversations.open", json!({ "users": user.as_str() }))
            .await?;
        let channel = ChannelId::from(opened.channel.id);
        let _ = self
            .dm_channels
            .lock()
            .insert(user.clone(), channel.clone());
        Ok(channel)
    }
}

impl std::fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ChatPlatform for SlackClient {
    #[instrument(skip(self))]
    async fn list_members(&self) -> Result<Vec<ChatMember>> {
        let mut members = Vec::new();
        let mut cursor = String::new();
        for _ in 0..MAX_PAGES {
            let mut query = vec![("limit", PAGE_LIMIT.to_string())];
            if !cursor.is_empty() {
                query.push(("cursor", cursor.clone()));
            }
            let page: UsersList = self.get("users.list", &query).await?;
            members.extend(page.members.into_iter().map(ChatMember::from));

            cursor = page
                .response_metadata
                .map(|m| m.next_cursor)
                .unwrap_or_default();
            if cursor.is_empty() {
                break;
            }
        }
        debug!(count = members.len(), "members listed");
        Ok(members)
    }

    async fn self_identity(&self) -> Result<ChatId> {
        let auth: AuthTest = self.post("auth.test", json!({})).await?;
        Ok(ChatId::from(auth.user_id))
    }

    async fn send_direct(&self, user: &ChatId, text: &str) -> Result<()> {
        let channel = self.open_direct(user).await?;
        self.send_to_channel(&channel, text).await
    }

    async fn send_to_channel(&self, channel: &ChannelId, text: &str) -> Result<()> {
        let _: Value = self
            .post(
                "chat.postMessage",
                json!({ "channel": channel.as_str(), "text": text, "as_user": true }),
            )
            .await?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
