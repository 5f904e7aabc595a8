//! Dependency-injection seams for the chat platform.

use async_trait::async_trait;
use tardy_core::{ChannelId, ChatId};

use crate::errors::Result;
use crate::event::EventStream;

/// One workspace member as the directory refresher sees it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatMember {
    /// Platform user id.
    pub chat_id: ChatId,
    /// Profile email; empty when hidden or unset.
    pub email: String,
    /// Bot users are never nagged.
    pub is_bot: bool,
    /// Deactivated account.
    pub deleted: bool,
}

/// Outbound and directory operations.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Every member of the workspace.
    async fn list_members(&self) -> Result<Vec<ChatMember>>;

    /// The bot's own user id.
    async fn self_identity(&self) -> Result<ChatId>;

    /// Private message to a single user.
    async fn send_direct(&self, user: &ChatId, text: &str) -> Result<()>;

    /// Message to a channel or existing conversation.
    async fn send_to_channel(&self, channel: &ChannelId, text: &str) -> Result<()>;
}

/// Opens the live inbound event stream.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Connect and return the stream. Connection failures are reported as
    /// events on the stream, which then ends.
    async fn connect(&self) -> EventStream;
}
