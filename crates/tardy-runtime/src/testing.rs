//! In-memory fakes for the chat platform and compliance feed, plus a
//! [`TestBot`] builder that wires them into a [`BotContext`].
//!
//! Only compiled for tests and with the `testing` feature.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use tardy_chat::{ChatError, ChatMember, ChatPlatform, MessageEvent};
use tardy_compliance::{
    ComplianceError, ComplianceFeed, NonCompliantPage, NonCompliantUser, PageToken, ReportingPeriod,
};
use tardy_core::{ChannelId, ChatId, ExternalId};
use tardy_messages::MessageRepository;
use tardy_settings::{PrivilegedList, TardySettings};

use crate::context::BotContext;

/// Chat id of the bot in every [`TestBot`].
pub const BOT_ID: &str = "B1";
/// Channel used by [`message`].
pub const CHANNEL: &str = "C1";

/// Member with an email, not a bot, not deleted.
pub fn member(chat_id: &str, email: &str) -> ChatMember {
    ChatMember {
        chat_id: ChatId::from(chat_id),
        email: email.to_string(),
        is_bot: false,
        deleted: false,
    }
}

/// Message from `sender` in [`CHANNEL`].
pub fn message(sender: &str, text: &str) -> MessageEvent {
    MessageEvent {
        sender: ChatId::from(sender),
        channel: ChannelId::from(CHANNEL),
        text: text.to_string(),
    }
}

/// One outbound message recorded by [`FakeChat`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Sent {
    /// `send_direct`.
    Direct {
        /// Recipient.
        user: ChatId,
        /// Body.
        text: String,
    },
    /// `send_to_channel`.
    Channel {
        /// Target channel.
        channel: ChannelId,
        /// Body.
        text: String,
    },
}

fn fake_failure(method: &str) -> ChatError {
    ChatError::Api {
        method: method.to_string(),
        error: "fake_failure".to_string(),
    }
}

/// Chat platform that records sends.
#[derive(Debug)]
pub struct FakeChat {
    bot_id: ChatId,
    members: Mutex<Vec<ChatMember>>,
    sent: Mutex<Vec<Sent>>,
    fail_listing: AtomicBool,
    fail_channel: AtomicBool,
    fail_direct_to: Mutex<HashSet<ChatId>>,
}

impl FakeChat {
    /// Fake whose own identity is `bot_id`.
    pub fn new(bot_id: &str) -> Self {
        Self {
            bot_id: ChatId::from(bot_id),
            members: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            fail_listing: AtomicBool::new(false),
            fail_channel: AtomicBool::new(false),
            fail_direct_to: Mutex::new(HashSet::new()),
        }
    }

    /// Replace the member listing.
    pub fn set_members(&self, members: Vec<ChatMember>) {
        *self.members.lock() = members;
    }

    /// Make `list_members` fail.
    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// Make every `send_to_channel` fail.
    pub fn fail_channel_sends(&self, fail: bool) {
        self.fail_channel.store(fail, Ordering::SeqCst);
    }

    /// Make direct messages to these users fail.
    pub fn fail_sends_to(&self, users: &[&str]) {
        self.fail_direct_to
            .lock()
            .extend(users.iter().map(|u| ChatId::from(*u)));
    }

    /// Everything sent so far, in order.
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }

    /// Texts posted to `channel`.
    pub fn channel_texts(&self, channel: &ChannelId) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter_map(|s| match s {
                Sent::Channel { channel: c, text } if c == channel => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Texts sent privately to `user`.
    pub fn direct_texts(&self, user: &ChatId) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter_map(|s| match s {
                Sent::Direct { user: u, text } if u == user => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Wait (in small sleeps) until at least `count` messages were sent.
    /// Returns `false` if that did not happen within a few seconds.
    pub async fn wait_for_sent(&self, count: usize) -> bool {
        for _ in 0..500 {
            if self.sent.lock().len() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

#[async_trait]
impl ChatPlatform for FakeChat {
    async fn list_members(&self) -> tardy_chat::Result<Vec<ChatMember>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(fake_failure("users.list"));
        }
        Ok(self.members.lock().clone())
    }

    async fn self_identity(&self) -> tardy_chat::Result<ChatId> {
        Ok(self.bot_id.clone())
    }

    async fn send_direct(&self, user: &ChatId, text: &str) -> tardy_chat::Result<()> {
        if self.fail_direct_to.lock().contains(user) {
            return Err(fake_failure("chat.postMessage"));
        }
        self.sent.lock().push(Sent::Direct {
            user: user.clone(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_to_channel(&self, channel: &ChannelId, text: &str) -> tardy_chat::Result<()> {
        if self.fail_channel.load(Ordering::SeqCst) {
            return Err(fake_failure("chat.postMessage"));
        }
        self.sent.lock().push(Sent::Channel {
            channel: channel.clone(),
            text: text.to_string(),
        });
        Ok(())
    }
}

/// Compliance feed serving a mutable late list in pages of `page_size`.
#[derive(Debug)]
pub struct FakeFeed {
    periods: Mutex<Vec<ReportingPeriod>>,
    late: Mutex<Vec<String>>,
    page_size: usize,
    fail: AtomicBool,
    delay: Mutex<Duration>,
}

impl FakeFeed {
    /// One period starting 2000-01-03, pages of two users.
    pub fn new() -> Self {
        Self {
            periods: Mutex::new(vec![ReportingPeriod::new("2000-01-03", "2000-01-09")]),
            late: Mutex::new(Vec::new()),
            page_size: 2,
            fail: AtomicBool::new(false),
            delay: Mutex::new(Duration::ZERO),
        }
    }

    /// Replace the late list.
    pub fn set_late(&self, emails: &[&str]) {
        *self.late.lock() = emails.iter().map(|e| (*e).to_string()).collect();
    }

    /// Replace the reporting periods.
    pub fn set_periods(&self, periods: Vec<ReportingPeriod>) {
        *self.periods.lock() = periods;
    }

    /// Make every call fail.
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Make `list_periods` take `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    fn check(&self) -> tardy_compliance::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ComplianceError::Status {
                status: 503,
                url: "fake://feed".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for FakeFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ComplianceFeed for FakeFeed {
    async fn list_periods(&self) -> tardy_compliance::Result<Vec<ReportingPeriod>> {
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.check()?;
        Ok(self.periods.lock().clone())
    }

    async fn list_non_compliant(
        &self,
        _period_start: NaiveDate,
        page: Option<&PageToken>,
    ) -> tardy_compliance::Result<NonCompliantPage> {
        self.check()?;
        let late = self.late.lock();
        let offset = page.and_then(|t| t.0.parse::<usize>().ok()).unwrap_or(0);
        let end = (offset + self.page_size).min(late.len());
        let users = late
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(NonCompliantUser::with_email)
            .collect();
        let next = (end < late.len()).then(|| PageToken(end.to_string()));
        Ok(NonCompliantPage { users, next })
    }
}

/// A context wired to fakes.
pub struct TestBot {
    /// The context under test.
    pub ctx: Arc<BotContext>,
    /// Its chat platform.
    pub chat: Arc<FakeChat>,
    /// Its compliance feed.
    pub feed: Arc<FakeFeed>,
}

impl TestBot {
    /// Start building.
    pub fn builder() -> TestBotBuilder {
        TestBotBuilder::default()
    }
}

/// Builder for [`TestBot`].
#[derive(Default)]
pub struct TestBotBuilder {
    chat: Option<FakeChat>,
    members: Option<Vec<ChatMember>>,
    directory: Vec<(ExternalId, ChatId)>,
    late: Vec<String>,
    settings: TardySettings,
}

impl TestBotBuilder {
    /// Use a preconfigured chat fake.
    #[must_use]
    pub fn chat(mut self, chat: FakeChat) -> Self {
        self.chat = Some(chat);
        self
    }

    /// Member listing returned by the chat fake.
    #[must_use]
    pub fn members(mut self, members: Vec<ChatMember>) -> Self {
        self.members = Some(members);
        self
    }

    /// Pre-populate the directory cache.
    #[must_use]
    pub fn directory(mut self, pairs: &[(&str, &str)]) -> Self {
        self.directory
            .extend(pairs.iter().map(|(e, c)| (ExternalId::from(*e), ChatId::from(*c))));
        self
    }

    /// Emails the feed reports as late.
    #[must_use]
    pub fn late(mut self, emails: &[&str]) -> Self {
        self.late = emails.iter().map(|e| (*e).to_string()).collect();
        self
    }

    /// Privileged identities.
    #[must_use]
    pub fn privileged(mut self, entries: &[&str]) -> Self {
        self.settings.privileged = PrivilegedList(entries.iter().map(|e| (*e).to_string()).collect());
        self
    }

    /// Chance of answering an indirect mention.
    #[must_use]
    pub fn easter_egg_probability(mut self, p: f64) -> Self {
        self.settings.dispatch.easter_egg_probability = p;
        self
    }

    /// Nag window.
    #[must_use]
    pub fn nag_window(mut self, window: Duration) -> Self {
        self.settings.schedule.nag_window_secs = window.as_secs();
        self
    }

    /// Wire everything together.
    pub fn build(self) -> TestBot {
        let chat = Arc::new(self.chat.unwrap_or_else(|| FakeChat::new(BOT_ID)));
        if let Some(members) = self.members {
            chat.set_members(members);
        }
        let feed = Arc::new(FakeFeed::new());
        let late: Vec<&str> = self.late.iter().map(String::as_str).collect();
        feed.set_late(&late);

        let messages = MessageRepository::builtin().expect("built-in templates are valid");
        let ctx = BotContext::new(
            ChatId::from(BOT_ID),
            Arc::clone(&chat) as Arc<dyn ChatPlatform>,
            Arc::clone(&feed) as Arc<dyn ComplianceFeed>,
            messages,
            self.settings,
        );
        for (email, chat_id) in self.directory {
            ctx.directory.put(email, chat_id);
        }

        TestBot {
            ctx: Arc::new(ctx),
            chat,
            feed,
        }
    }
}
