//! Federation router.
//!
//! The router owns every registered [`Bot`] and [`EnabledTransport`] and
//! fans moderation actions out between them:
//!
//! - An action taken on a bot is wrapped in a [`FederatedMessage`] and sent
//!   on every transport that permits [`Feature::Send`], then performed on every
//!   other bot. The originating bot never sees its own action again.
//! - A message received on a transport is performed on every bot, including
//!   the one whose identity matches the message's guild id. Nothing received
//!   is re-sent on any transport.
//!
//! Adapter callbacks never route directly: they push a [`RouterEvent`] onto
//! an unbounded queue, and a single consumer ([`FederationRouter::run_until`]
//! or [`FederationRouter::process_pending`]) dispatches events one at a time.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut router = FederationRouter::new(RouterConfig::default());
//! router.register_bot(Bot::new("bot-a", MockBot::new()))?;
//! router.register_transport(MockTransport::new("bus", FeatureSet::SEND_RECEIVE), None)?;
//! router.run_until(shutdown).await?;
//! ```

mod dedup;
mod history;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::action::ModerationAction;
use crate::bot::{ActionCallback, Bot};
use crate::envelope::FederatedMessage;
use crate::error::{RouterError, RouterResult};
use crate::transport::{
    EnabledTransport, Feature, FeatureSet, ReceiveHandler, Transport, TransportAdapter, TransportId,
};

pub use dedup::SeenMessages;
pub use history::{ActionHistory, ActionOrigin, ActionRecord};

// =============================================================================
// Configuration
// =============================================================================

/// Router settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Remember this many message ids and drop inbound repeats.
    ///
    /// Disabled by default. When enabled, ids of messages this router sent
    /// are remembered too, so a bus that echoes our own messages back does
    /// not cause them to be performed twice.
    pub dedup_capacity: Option<usize>,

    /// Number of routed actions kept for inspection. Zero disables history.
    pub history_capacity: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            dedup_capacity: None,
            history_capacity: 256,
        }
    }
}

// =============================================================================
// Events and Handles
// =============================================================================

/// Work item queued by adapter callbacks.
#[derive(Debug, Clone)]
pub enum RouterEvent {
    /// A bot reported a locally taken action.
    BotAction {
        action: ModerationAction,
        origin: String,
    },
    /// A transport delivered a decoded message.
    TransportMessage {
        message: FederatedMessage,
        origin: TransportId,
    },
}

/// Returned by [`FederationRouter::register_bot`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BotHandle {
    index: usize,
    identity: String,
}

impl BotHandle {
    pub fn identity(&self) -> &str {
        &self.identity
    }
}

/// Returned by [`FederationRouter::register_transport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransportHandle {
    index: usize,
    id: TransportId,
}

impl TransportHandle {
    pub fn id(&self) -> TransportId {
        self.id
    }
}

// =============================================================================
// Router
// =============================================================================

/// Fans moderation actions out between bots and transports.
pub struct FederationRouter {
    config: RouterConfig,
    bots: Vec<Bot>,
    transports: Vec<EnabledTransport>,
    events_tx: mpsc::UnboundedSender<RouterEvent>,
    events_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<RouterEvent>>,
    started: AtomicBool,
    seen: Option<Mutex<SeenMessages>>,
    history: Mutex<ActionHistory>,
}

impl FederationRouter {
    pub fn new(config: RouterConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let seen = config
            .dedup_capacity
            .map(|capacity| Mutex::new(SeenMessages::new(capacity)));
        let history = Mutex::new(ActionHistory::new(config.history_capacity));

        Self {
            config,
            bots: Vec::new(),
            transports: Vec::new(),
            events_tx,
            events_rx: tokio::sync::Mutex::new(events_rx),
            started: AtomicBool::new(false),
            seen,
            history,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Returns whether [`start`](Self::start) has been called.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    // -------------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------------

    /// Registers a bot and installs the router's action callback on it.
    pub fn register_bot(&mut self, bot: Bot) -> RouterResult<BotHandle> {
        self.ensure_not_started()?;

        let identity = bot.identity().to_string();
        if identity.trim().is_empty() {
            return Err(RouterError::InvalidBot("bot identity is empty".into()));
        }
        if self.bots.iter().any(|b| b.identity() == identity) {
            return Err(RouterError::InvalidBot(format!(
                "a bot with identity '{identity}' is already registered"
            )));
        }

        let events = self.events_tx.clone();
        let callback: ActionCallback = Arc::new(move |action: ModerationAction, origin: &str| {
            let event = RouterEvent::BotAction {
                action,
                origin: origin.to_string(),
            };
            if events.send(event).is_err() {
                warn!(bot = %origin, "Router is gone, dropping bot action");
            }
        });
        bot.set_action_callback(callback);

        info!(bot = %identity, "Registered bot");
        self.bots.push(bot);
        Ok(BotHandle {
            index: self.bots.len() - 1,
            identity,
        })
    }

    /// Registers a transport with the given features enabled.
    ///
    /// `features` defaults to everything the adapter advertises and must be a
    /// subset of it. The transport is enabled, and the router's dispatch is
    /// installed as its receive handler when [`Feature::Receive`] is permitted.
    pub fn register_transport(
        &mut self,
        adapter: impl TransportAdapter,
        features: Option<FeatureSet>,
    ) -> RouterResult<TransportHandle> {
        self.ensure_not_started()?;

        let transport = Transport::new(adapter);
        let name = transport.name().to_string();
        let advertised = transport.advertised_features();
        let requested = features.unwrap_or(advertised);
        if !advertised.contains(requested) {
            return Err(RouterError::InvalidFeatureSet {
                transport: name,
                requested,
                advertised,
            });
        }

        let id = transport.id();
        let mut enabled = EnabledTransport::new(transport);
        enabled
            .enable_feature(requested)
            .map_err(|_| RouterError::InvalidFeatureSet {
                transport: name.clone(),
                requested,
                advertised,
            })?;
        enabled.enable();

        if enabled.permits(Feature::Receive) {
            let events = self.events_tx.clone();
            let handler: ReceiveHandler =
                Arc::new(move |message: FederatedMessage, origin: TransportId| {
                    if events
                        .send(RouterEvent::TransportMessage { message, origin })
                        .is_err()
                    {
                        warn!(transport = %origin, "Router is gone, dropping inbound message");
                    }
                });
            // Receive is permitted and the transport is enabled, so this cannot fail.
            if let Err(e) = enabled.set_receive_handler(handler) {
                warn!(transport = %enabled.name(), error = %e, "Failed to install receive handler");
            }
        }

        info!(
            transport = %enabled.name(),
            features = %requested,
            "Registered transport"
        );
        self.transports.push(enabled);
        Ok(TransportHandle {
            index: self.transports.len() - 1,
            id,
        })
    }

    fn ensure_not_started(&self) -> RouterResult<()> {
        if self.is_started() {
            Err(RouterError::RegistrationAfterStart)
        } else {
            Ok(())
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn bot(&self, handle: &BotHandle) -> Option<&Bot> {
        self.bots.get(handle.index)
    }

    pub fn transport(&self, handle: &TransportHandle) -> Option<&EnabledTransport> {
        self.transports.get(handle.index)
    }

    /// Mutable access, e.g. to disable a transport at runtime.
    pub fn transport_mut(&mut self, handle: &TransportHandle) -> Option<&mut EnabledTransport> {
        self.transports.get_mut(handle.index)
    }

    pub fn bots(&self) -> impl Iterator<Item = &Bot> {
        self.bots.iter()
    }

    pub fn transports(&self) -> impl Iterator<Item = &EnabledTransport> {
        self.transports.iter()
    }

    /// Recently routed actions, oldest first.
    pub fn history(&self) -> Vec<ActionRecord> {
        self.history.lock().snapshot()
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Starts every enabled transport, then every bot.
    ///
    /// Stops at the first failure and reports it as
    /// [`RouterError::StartupFailed`]. Components started before the failure
    /// are left running; call [`stop`](Self::stop) to tear them down.
    pub async fn start(&self) -> RouterResult<()> {
        self.started.store(true, Ordering::SeqCst);
        info!(
            bots = self.bots.len(),
            transports = self.transports.len(),
            "Starting federation router"
        );

        for transport in &self.transports {
            if !transport.is_enabled() {
                debug!(transport = %transport.name(), "Skipping disabled transport");
                continue;
            }
            check_started(transport.name(), transport.start().await)?;
        }

        for bot in &self.bots {
            check_started(bot.identity(), bot.start().await)?;
        }

        info!("Federation router started");
        Ok(())
    }

    /// Stops every bot, then every transport. Failures are logged.
    pub async fn stop(&self) {
        info!("Stopping federation router");

        for bot in &self.bots {
            if let Err(e) = bot.stop().await {
                warn!(bot = %bot.identity(), error = %e, "Failed to stop bot");
            }
        }

        for transport in &self.transports {
            if let Err(e) = transport.stop().await {
                warn!(transport = %transport.name(), error = %e, "Failed to stop transport");
            }
        }

        info!("Federation router stopped");
    }

    /// Starts the router, dispatches events until `shutdown` resolves, then stops.
    pub async fn run_until<F>(&self, shutdown: F) -> RouterResult<()>
    where
        F: Future<Output = ()>,
    {
        if let Err(e) = self.start().await {
            self.stop().await;
            return Err(e);
        }
        self.dispatch_until(shutdown).await;
        self.stop().await;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Dispatch
    // -------------------------------------------------------------------------

    /// Dispatches queued events until `shutdown` resolves.
    pub async fn dispatch_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut events = self.events_rx.lock().await;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    debug!("Shutdown requested, leaving dispatch loop");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => self.dispatch(event).await,
                    None => break,
                },
            }
        }
    }

    /// Dispatches every event already queued. Returns how many were handled.
    pub async fn process_pending(&self) -> usize {
        let mut events = self.events_rx.lock().await;
        let mut handled = 0;
        while let Ok(event) = events.try_recv() {
            self.dispatch(event).await;
            handled += 1;
        }
        handled
    }

    /// Routes a single event.
    pub async fn dispatch(&self, event: RouterEvent) {
        match event {
            RouterEvent::BotAction { action, origin } => self.on_bot_action(&action, &origin).await,
            RouterEvent::TransportMessage { message, origin } => {
                self.on_transport_message(&message, origin).await
            }
        }
    }

    /// Broadcasts an action taken on the bot `origin`.
    ///
    /// Sent once per transport permitting [`Feature::Send`], then performed on
    /// every running bot except `origin`. Individual failures are logged and
    /// do not stop the broadcast.
    pub async fn on_bot_action(&self, action: &ModerationAction, origin: &str) {
        debug!(origin = %origin, action = %action, "Routing bot action");
        self.history
            .lock()
            .record(action.clone(), ActionOrigin::Bot(origin.to_string()));

        let senders: Vec<&EnabledTransport> = self
            .transports
            .iter()
            .filter(|transport| transport.permits(Feature::Send))
            .collect();
        if !senders.is_empty() {
            let message = FederatedMessage::new(action.clone(), origin);
            self.remember(message.message_id());
            for transport in senders {
                match transport.send(&message).await {
                    Ok(()) => debug!(
                        transport = %transport.name(),
                        message_id = %message.message_id(),
                        "Sent federated message"
                    ),
                    Err(e) => error!(
                        transport = %transport.name(),
                        error = %e,
                        "Failed to send federated message"
                    ),
                }
            }
        }

        for bot in self.bots.iter().filter(|bot| bot.identity() != origin) {
            self.perform_on(bot, action).await;
        }
    }

    /// Performs an action received on a transport on every running bot.
    pub async fn on_transport_message(&self, message: &FederatedMessage, origin: TransportId) {
        if !self.remember(message.message_id()) {
            debug!(
                message_id = %message.message_id(),
                "Dropping already seen message"
            );
            return;
        }

        let transport = self
            .transports
            .iter()
            .find(|transport| transport.transport().id() == origin)
            .map(|transport| transport.name().to_string())
            .unwrap_or_else(|| origin.to_string());
        debug!(transport = %transport, message = %message, "Routing transport message");
        self.history
            .lock()
            .record(message.action().clone(), ActionOrigin::Transport(transport));

        for bot in &self.bots {
            self.perform_on(bot, message.action()).await;
        }
    }

    async fn perform_on(&self, bot: &Bot, action: &ModerationAction) {
        if !bot.is_running() {
            debug!(bot = %bot.identity(), "Skipping bot that is not running");
            return;
        }
        if let Err(e) = bot.perform_action(action, false).await {
            error!(bot = %bot.identity(), error = %e, "Failed to perform action");
        }
    }

    /// Records `id`; returns `false` if dedup is on and it was already seen.
    fn remember(&self, id: Uuid) -> bool {
        match &self.seen {
            Some(seen) => seen.lock().insert(id),
            None => true,
        }
    }
}

fn check_started<E: std::fmt::Display>(component: &str, result: Result<bool, E>) -> RouterResult<()> {
    match result {
        Ok(true) => Ok(()),
        Ok(false) => Err(RouterError::StartupFailed {
            component: component.to_string(),
            reason: "another lifecycle transition is in progress".into(),
        }),
        Err(e) => {
            error!(component = %component, error = %e, "Failed to start");
            Err(RouterError::StartupFailed {
                component: component.to_string(),
                reason: e.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionDraft, ActionReason};
    use crate::mock::{MockBot, MockTransport};

    fn ban(target: &str) -> ModerationAction {
        ModerationAction::create("ban", ActionDraft::new(target, "M1", "spam", ActionReason::Spam))
            .unwrap()
    }

    fn kick(target: &str) -> ModerationAction {
        ModerationAction::create(
            "kick",
            ActionDraft::new(target, "M1", "flooding", ActionReason::DisruptiveBehavior),
        )
        .unwrap()
    }

    struct Fixture {
        router: FederationRouter,
        bot_a: MockBot,
        bot_b: MockBot,
        bus: MockTransport,
    }

    fn fixture(config: RouterConfig, bus_features: Option<FeatureSet>) -> Fixture {
        let bot_a = MockBot::new();
        let bot_b = MockBot::new();
        let bus = MockTransport::new("bus", FeatureSet::SEND_RECEIVE);

        let mut router = FederationRouter::new(config);
        router.register_bot(Bot::new("bot-a", bot_a.clone())).unwrap();
        router.register_bot(Bot::new("bot-b", bot_b.clone())).unwrap();
        router.register_transport(bus.clone(), bus_features).unwrap();

        Fixture {
            router,
            bot_a,
            bot_b,
            bus,
        }
    }

    #[tokio::test]
    async fn test_bot_action_fans_out_without_echo() {
        let f = fixture(RouterConfig::default(), None);
        f.router.start().await.unwrap();

        let original = ban("U1");
        assert!(f.bot_a.fake_action(original.clone()));
        assert_eq!(f.router.process_pending().await, 1);

        let sent = f.bus.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].action_guild_id(), "bot-a");
        assert_eq!(sent[0].action(), &original);
        assert_eq!(f.bot_b.performed(), vec![original]);
        assert!(f.bot_a.performed().is_empty());
    }

    #[tokio::test]
    async fn test_transport_message_reaches_every_bot() {
        let f = fixture(RouterConfig::default(), None);
        f.router.start().await.unwrap();

        let message = FederatedMessage::new(kick("U2"), "bot-a");
        assert!(f.bus.inject_message(&message));
        assert_eq!(f.router.process_pending().await, 1);

        // Received messages go to every bot, including the one named as origin.
        assert_eq!(f.bot_a.performed(), vec![message.action().clone()]);
        assert_eq!(f.bot_b.performed(), vec![message.action().clone()]);
        // And are never re-sent.
        assert!(f.bus.sent().is_empty());
    }

    #[tokio::test]
    async fn test_send_failure_does_not_stop_local_fan_out() {
        let f = fixture(RouterConfig::default(), None);
        f.router.start().await.unwrap();
        f.bus.fail_sends(true);

        f.bot_a.fake_action(ban("U1"));
        f.router.process_pending().await;

        assert!(f.bus.sent().is_empty());
        assert_eq!(f.bot_b.performed().len(), 1);
    }

    #[tokio::test]
    async fn test_failing_transport_does_not_block_later_transports() {
        let bot_a = MockBot::new();
        let bot_b = MockBot::new();
        let broken = MockTransport::new("broken", FeatureSet::SEND_RECEIVE);
        let healthy = MockTransport::new("healthy", FeatureSet::SEND_RECEIVE);
        broken.fail_sends(true);

        let mut router = FederationRouter::new(RouterConfig::default());
        router.register_bot(Bot::new("bot-a", bot_a.clone())).unwrap();
        router.register_bot(Bot::new("bot-b", bot_b.clone())).unwrap();
        router.register_transport(broken.clone(), None).unwrap();
        router.register_transport(healthy.clone(), None).unwrap();
        router.start().await.unwrap();

        let original = ban("U1");
        bot_a.fake_action(original.clone());
        router.process_pending().await;

        assert!(broken.sent().is_empty());
        let sent = healthy.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].action(), &original);
        assert_eq!(bot_b.performed(), vec![original]);
        assert!(bot_a.performed().is_empty());
    }

    #[tokio::test]
    async fn test_bot_failure_does_not_stop_broadcast() {
        let f = fixture(RouterConfig::default(), None);
        let bot_c = MockBot::new();
        let mut router = f.router;
        router.register_bot(Bot::new("bot-c", bot_c.clone())).unwrap();
        router.start().await.unwrap();
        f.bot_b.fail_execute(true);

        f.bot_a.fake_action(ban("U1"));
        router.process_pending().await;

        assert_eq!(f.bus.sent().len(), 1);
        assert!(f.bot_b.performed().is_empty());
        assert_eq!(bot_c.performed().len(), 1);
    }

    #[tokio::test]
    async fn test_receive_only_transport_is_not_sent_to() {
        let f = fixture(RouterConfig::default(), Some(FeatureSet::RECEIVE));
        f.router.start().await.unwrap();

        f.bot_a.fake_action(ban("U1"));
        f.router.process_pending().await;

        assert!(f.bus.sent().is_empty());
        assert_eq!(f.bot_b.performed().len(), 1);
    }

    #[tokio::test]
    async fn test_send_only_transport_drops_inbound() {
        let f = fixture(RouterConfig::default(), Some(FeatureSet::SEND));
        f.router.start().await.unwrap();

        let message = FederatedMessage::new(ban("U1"), "elsewhere");
        assert!(!f.bus.inject_message(&message));
        assert_eq!(f.router.process_pending().await, 0);
        assert!(f.bot_a.performed().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_transport_is_skipped() {
        let mut f = fixture(RouterConfig::default(), None);
        let handle = TransportHandle {
            index: 0,
            id: f.router.transports[0].transport().id(),
        };
        f.router.transport_mut(&handle).unwrap().disable().await;
        f.router.start().await.unwrap();

        assert_eq!(f.bus.connect_count(), 0);
        f.bot_a.fake_action(ban("U1"));
        f.router.process_pending().await;
        assert!(f.bus.sent().is_empty());
        assert_eq!(f.bot_b.performed().len(), 1);
    }

    #[tokio::test]
    async fn test_dedup_drops_echo_and_repeats() {
        let config = RouterConfig {
            dedup_capacity: Some(16),
            ..RouterConfig::default()
        };
        let f = fixture(config, None);
        f.router.start().await.unwrap();

        // Our own message echoed back by the bus.
        f.bot_a.fake_action(ban("U1"));
        f.router.process_pending().await;
        let echoed = f.bus.sent().remove(0);
        f.bus.inject_message(&echoed);
        f.router.process_pending().await;
        assert!(f.bot_a.performed().is_empty());
        assert_eq!(f.bot_b.performed().len(), 1);

        // A foreign message delivered twice.
        let foreign = FederatedMessage::new(ban("U2"), "remote");
        f.bus.inject_message(&foreign);
        f.bus.inject_message(&foreign);
        f.router.process_pending().await;
        assert_eq!(f.bot_a.performed().len(), 1);
        assert_eq!(f.bot_b.performed().len(), 2);
    }

    #[tokio::test]
    async fn test_echo_is_performed_without_dedup() {
        let f = fixture(RouterConfig::default(), None);
        f.router.start().await.unwrap();

        f.bot_a.fake_action(ban("U1"));
        f.router.process_pending().await;
        let echoed = f.bus.sent().remove(0);
        f.bus.inject_message(&echoed);
        f.router.process_pending().await;

        assert_eq!(f.bot_a.performed().len(), 1);
        assert_eq!(f.bot_b.performed().len(), 2);
    }

    #[tokio::test]
    async fn test_history_records_origins() {
        let f = fixture(RouterConfig::default(), None);
        f.router.start().await.unwrap();

        f.bot_a.fake_action(ban("U1"));
        f.bus.inject_message(&FederatedMessage::new(ban("U2"), "remote"));
        f.router.process_pending().await;

        let origins: Vec<ActionOrigin> = f
            .router
            .history()
            .into_iter()
            .map(|record| record.origin)
            .collect();
        assert_eq!(
            origins,
            vec![
                ActionOrigin::Bot("bot-a".into()),
                ActionOrigin::Transport("bus".into())
            ]
        );
    }

    #[tokio::test]
    async fn test_startup_failure_names_component() {
        let bus = MockTransport::new("bus", FeatureSet::SEND_RECEIVE);
        bus.fail_start(true);
        let bot = MockBot::new();

        let mut router = FederationRouter::new(RouterConfig::default());
        router.register_bot(Bot::new("bot-a", bot.clone())).unwrap();
        router.register_transport(bus, None).unwrap();

        match router.start().await {
            Err(RouterError::StartupFailed { component, .. }) => assert_eq!(component, "bus"),
            other => panic!("expected StartupFailed, got {other:?}"),
        }
        // Transports start first, so the bot was never touched.
        assert_eq!(bot.connect_count(), 0);
    }

    #[tokio::test]
    async fn test_registration_rules() {
        let mut router = FederationRouter::new(RouterConfig::default());
        router.register_bot(Bot::new("bot-a", MockBot::new())).unwrap();

        assert!(matches!(
            router.register_bot(Bot::new("bot-a", MockBot::new())),
            Err(RouterError::InvalidBot(_))
        ));
        assert!(matches!(
            router.register_bot(Bot::new("  ", MockBot::new())),
            Err(RouterError::InvalidBot(_))
        ));
        assert!(matches!(
            router.register_transport(
                MockTransport::new("rx", FeatureSet::RECEIVE),
                Some(FeatureSet::SEND_RECEIVE)
            ),
            Err(RouterError::InvalidFeatureSet { .. })
        ));

        router.start().await.unwrap();
        assert!(matches!(
            router.register_bot(Bot::new("bot-b", MockBot::new())),
            Err(RouterError::RegistrationAfterStart)
        ));
    }

    #[tokio::test]
    async fn test_run_until_dispatches_and_stops() {
        let f = fixture(RouterConfig::default(), None);
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let bot_a = f.bot_a.clone();
        let bot_b = f.bot_b.clone();
        let driver = async move {
            while bot_a.connect_count() == 0 || bot_b.connect_count() == 0 {
                tokio::task::yield_now().await;
            }
            bot_a.fake_action(ban("U1"));
            while bot_b.performed().is_empty() {
                tokio::task::yield_now().await;
            }
            let _ = stop_tx.send(());
        };

        let run = f.router.run_until(async {
            let _ = stop_rx.await;
        });
        let (result, ()) = tokio::join!(run, driver);
        result.unwrap();

        assert_eq!(f.bus.sent().len(), 1);
        assert_eq!(f.bot_a.disconnect_count(), 1);
        assert_eq!(f.bus.disconnect_count(), 1);
        assert!(f.router.bots().all(|bot| !bot.is_running()));
    }
}
