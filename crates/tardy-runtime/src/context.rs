//! Shared state and collaborators for every runtime task.

use std::future::Future;
use std::sync::Arc;

use tardy_chat::ChatPlatform;
use tardy_compliance::{ComplianceFeed, ComplianceSource};
use tardy_core::ChatId;
use tardy_messages::MessageRepository;
use tardy_settings::TardySettings;
use tardy_state::{DirectoryCache, PrivilegedUsers, ViolatorSet};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Everything the dispatcher and background jobs share.
///
/// Held as `Arc<BotContext>`; the state members carry their own locks.
pub struct BotContext {
    /// The bot's own chat id, used to detect mentions.
    pub bot_id: ChatId,
    /// Email → chat id mapping.
    pub directory: Arc<DirectoryCache>,
    /// Users to scold on their next message.
    pub violators: Arc<ViolatorSet>,
    /// Users allowed to issue admin commands.
    pub privileged: Arc<PrivilegedUsers>,
    /// Outbound chat surface.
    pub chat: Arc<dyn ChatPlatform>,
    /// Late-user queries.
    pub compliance: ComplianceSource,
    /// Canned texts.
    pub messages: Arc<MessageRepository>,
    /// Effective settings.
    pub settings: Arc<TardySettings>,
    /// Cancelled on shutdown; stops loops and pending expiry timers.
    pub cancel: CancellationToken,
    /// Every task spawned through [`BotContext::spawn`], so shutdown can
    /// wait for in-flight replies and timers.
    pub tasks: TaskTracker,
}

impl BotContext {
    /// Assemble a context with empty state. Privileged users come from
    /// `settings.privileged`.
    pub fn new(
        bot_id: ChatId,
        chat: Arc<dyn ChatPlatform>,
        feed: Arc<dyn ComplianceFeed>,
        messages: MessageRepository,
        settings: TardySettings,
    ) -> Self {
        let privileged = PrivilegedUsers::new(settings.privileged.0.iter().cloned());
        Self {
            bot_id,
            directory: Arc::new(DirectoryCache::new()),
            violators: Arc::new(ViolatorSet::new()),
            privileged: Arc::new(privileged),
            chat,
            compliance: ComplianceSource::new(feed),
            messages: Arc::new(messages),
            settings: Arc::new(settings),
            cancel: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }

    /// Spawn a task tracked by [`BotContext::tasks`].
    pub fn spawn<F>(&self, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tasks.spawn(task)
    }

    /// `<@BOT>` as it appears in message text.
    pub fn bot_mention(&self) -> String {
        self.bot_id.mention()
    }
}

impl std::fmt::Debug for BotContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotContext")
            .field("bot_id", &self.bot_id)
            .field("directory", &self.directory.len())
            .field("violators", &self.violators.len())
            .field("privileged", &self.privileged.len())
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}
