//! Bot contract.
//!
//! A [`BotAdapter`] connects to one moderation surface. It enforces actions
//! routed to it and reports actions taken on the surface through the
//! [`ActionSink`] it receives in [`BotAdapter::connect`].
//!
//! The [`Bot`] wrapper adds an identity, lifecycle supervision and the action
//! callback the router installs at registration.

use std::fmt;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::action::ModerationAction;
use crate::error::{AdapterResult, BotError, BotResult};
use crate::lifecycle::{Lifecycle, LifecycleState};

/// Callback invoked with every action a bot reports, plus the bot's identity.
pub type ActionCallback = Arc<dyn Fn(ModerationAction, &str) + Send + Sync>;

/// A concrete moderation surface.
#[async_trait]
pub trait BotAdapter: Send + Sync + 'static {
    /// Connects to the surface. Locally taken actions are reported to `actions`.
    async fn connect(&self, actions: ActionSink) -> AdapterResult<()>;

    /// Disconnects from the surface.
    async fn disconnect(&self) -> AdapterResult<()>;

    /// Enforces `action` on the surface.
    async fn execute(&self, action: &ModerationAction) -> AdapterResult<()>;
}

/// A bot adapter that can be built from a configuration section.
pub trait ConfigurableBot: BotAdapter + Sized {
    /// Configuration type, deserialized from `bots.<identity>`.
    type Config: DeserializeOwned + Default;

    /// Adapter type name, e.g. `"http"`.
    fn adapter_name() -> &'static str;

    fn from_config(config: Self::Config) -> AdapterResult<Self>;
}

struct BotInner {
    identity: String,
    adapter: Arc<dyn BotAdapter>,
    lifecycle: Lifecycle,
    callback: RwLock<Option<ActionCallback>>,
}

impl BotInner {
    fn notify(&self, action: ModerationAction) -> bool {
        let callback = self.callback.read().clone();
        match callback {
            Some(callback) => {
                debug!(bot = %self.identity, action = %action, "Reporting action");
                callback(action, self.identity.as_str());
                true
            }
            None => {
                warn!(bot = %self.identity, "No action callback set, dropping action");
                false
            }
        }
    }
}

/// A bot adapter with an identity and a lifecycle.
///
/// Cloning is cheap; clones share the adapter and state.
#[derive(Clone)]
pub struct Bot {
    inner: Arc<BotInner>,
}

impl Bot {
    pub fn new(identity: impl Into<String>, adapter: impl BotAdapter) -> Self {
        Self::from_arc(identity, Arc::new(adapter))
    }

    pub fn from_arc(identity: impl Into<String>, adapter: Arc<dyn BotAdapter>) -> Self {
        Self {
            inner: Arc::new(BotInner {
                identity: identity.into(),
                adapter,
                lifecycle: Lifecycle::new(),
                callback: RwLock::new(None),
            }),
        }
    }

    /// Identity used as the guild id of everything this bot originates.
    pub fn identity(&self) -> &str {
        &self.inner.identity
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.lifecycle.state()
    }

    pub fn is_running(&self) -> bool {
        self.inner.lifecycle.is_running()
    }

    pub fn action_sink(&self) -> ActionSink {
        ActionSink {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Connects the adapter. Idempotent while running.
    pub async fn start(&self) -> BotResult<bool> {
        let adapter = Arc::clone(&self.inner.adapter);
        let sink = self.action_sink();
        let started = self
            .inner
            .lifecycle
            .start_with(|| async move { adapter.connect(sink).await })
            .await?;
        if started {
            info!(bot = %self.identity(), "Bot started");
        }
        Ok(started)
    }

    /// Disconnects the adapter. Idempotent while stopped.
    pub async fn stop(&self) -> BotResult<bool> {
        let adapter = Arc::clone(&self.inner.adapter);
        let stopped = self
            .inner
            .lifecycle
            .stop_with(|| async move { adapter.disconnect().await })
            .await?;
        if stopped {
            info!(bot = %self.identity(), "Bot stopped");
        }
        Ok(stopped)
    }

    /// Enforces `action` on this bot's surface.
    ///
    /// With `propagate` set, the action is also reported to the action
    /// callback as if it had been taken locally. Routed actions are always
    /// performed with `propagate == false`.
    pub async fn perform_action(&self, action: &ModerationAction, propagate: bool) -> BotResult<()> {
        if !self.is_running() {
            return Err(BotError::NotRunning {
                bot: self.identity().to_string(),
            });
        }
        self.inner.adapter.execute(action).await?;
        if propagate {
            self.inner.notify(action.clone());
        }
        Ok(())
    }

    /// Replaces the action callback.
    pub fn set_action_callback(&self, callback: ActionCallback) {
        *self.inner.callback.write() = Some(callback);
    }
}

impl fmt::Debug for Bot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bot")
            .field("identity", &self.identity())
            .field("state", &self.state())
            .finish()
    }
}

/// Reports actions taken on a surface back to the owning [`Bot`].
#[derive(Clone)]
pub struct ActionSink {
    inner: Weak<BotInner>,
}

impl ActionSink {
    /// Reports `action` as taken locally.
    ///
    /// Returns whether it reached a callback.
    pub fn report(&self, action: ModerationAction) -> bool {
        match self.inner.upgrade() {
            Some(inner) => inner.notify(action),
            None => false,
        }
    }

    /// Identity of the owning bot, if it still exists.
    pub fn identity(&self) -> Option<String> {
        self.inner.upgrade().map(|inner| inner.identity.clone())
    }
}

impl fmt::Debug for ActionSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionSink")
            .field("identity", &self.identity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionDraft, ActionReason};
    use crate::mock::MockBot;
    use parking_lot::Mutex;

    fn ban() -> ModerationAction {
        ModerationAction::create("ban", ActionDraft::new("U1", "M1", "spam", ActionReason::Spam))
            .unwrap()
    }

    fn recording_callback() -> (ActionCallback, Arc<Mutex<Vec<(ModerationAction, String)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: ActionCallback = Arc::new(move |action: ModerationAction, origin: &str| {
            sink.lock().push((action, origin.to_string()));
        });
        (callback, seen)
    }

    #[tokio::test]
    async fn test_perform_requires_running() {
        let bot = Bot::new("bot-a", MockBot::new());
        let err = bot.perform_action(&ban(), false).await.unwrap_err();
        assert!(matches!(err, BotError::NotRunning { .. }));
    }

    #[tokio::test]
    async fn test_propagate_flag_controls_callback() {
        let mock = MockBot::new();
        let bot = Bot::new("bot-a", mock.clone());
        let (callback, seen) = recording_callback();
        bot.set_action_callback(callback);
        bot.start().await.unwrap();

        bot.perform_action(&ban(), false).await.unwrap();
        assert_eq!(mock.performed().len(), 1);
        assert!(seen.lock().is_empty());

        bot.perform_action(&ban(), true).await.unwrap();
        assert_eq!(mock.performed().len(), 2);
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, "bot-a");
    }

    #[tokio::test]
    async fn test_fake_action_reports_through_sink() {
        let mock = MockBot::new();
        let bot = Bot::new("bot-a", mock.clone());
        let (callback, seen) = recording_callback();
        bot.set_action_callback(callback);
        bot.start().await.unwrap();

        assert!(mock.fake_action(ban()));
        assert!(mock.performed().is_empty());
        assert_eq!(seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_start_leaves_bot_stopped() {
        let mock = MockBot::new();
        mock.fail_start(true);
        let bot = Bot::new("bot-a", mock);

        assert!(matches!(bot.start().await, Err(BotError::Adapter(_))));
        assert_eq!(bot.state(), LifecycleState::Stopped);
    }

    #[test]
    fn test_report_without_callback() {
        let bot = Bot::new("bot-a", MockBot::new());
        assert!(!bot.action_sink().report(ban()));
    }
}
