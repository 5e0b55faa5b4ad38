//! In-memory bot and transport adapters for tests and demos.
//!
//! Both mocks are cheap to clone; clones share state, so a test can keep one
//! clone for inspection and hand the other to a [`Bot`](crate::Bot) or
//! [`Transport`](crate::Transport).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;

use crate::action::ModerationAction;
use crate::bot::{ActionSink, BotAdapter, ConfigurableBot};
use crate::envelope::FederatedMessage;
use crate::error::{AdapterError, AdapterResult};
use crate::transport::{FeatureSet, InboundSink, TransportAdapter};

// =============================================================================
// Mock Bot
// =============================================================================

#[derive(Default)]
struct MockBotState {
    performed: Mutex<Vec<ModerationAction>>,
    sink: Mutex<Option<ActionSink>>,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    fail_start: AtomicBool,
    fail_execute: AtomicBool,
}

/// A bot that records every action routed to it.
#[derive(Clone, Default)]
pub struct MockBot {
    state: Arc<MockBotState>,
}

impl MockBot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates a moderator acting on this surface.
    ///
    /// Returns whether the action reached the router callback.
    pub fn fake_action(&self, action: ModerationAction) -> bool {
        match self.state.sink.lock().as_ref() {
            Some(sink) => sink.report(action),
            None => false,
        }
    }

    /// Actions routed to this bot, in arrival order.
    pub fn performed(&self) -> Vec<ModerationAction> {
        self.state.performed.lock().clone()
    }

    pub fn connect_count(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> usize {
        self.state.disconnects.load(Ordering::SeqCst)
    }

    pub fn fail_start(&self, fail: bool) {
        self.state.fail_start.store(fail, Ordering::SeqCst);
    }

    pub fn fail_execute(&self, fail: bool) {
        self.state.fail_execute.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl BotAdapter for MockBot {
    async fn connect(&self, actions: ActionSink) -> AdapterResult<()> {
        if self.state.fail_start.load(Ordering::SeqCst) {
            return Err(AdapterError::connection("mock bot refused to start"));
        }
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        *self.state.sink.lock() = Some(actions);
        Ok(())
    }

    async fn disconnect(&self) -> AdapterResult<()> {
        self.state.disconnects.fetch_add(1, Ordering::SeqCst);
        self.state.sink.lock().take();
        Ok(())
    }

    async fn execute(&self, action: &ModerationAction) -> AdapterResult<()> {
        if self.state.fail_execute.load(Ordering::SeqCst) {
            return Err(AdapterError::internal("mock bot refused the action"));
        }
        self.state.performed.lock().push(action.clone());
        Ok(())
    }
}

/// Configuration for a `mock` bot section. The section carries no settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MockBotConfig {}

impl ConfigurableBot for MockBot {
    type Config = MockBotConfig;

    fn adapter_name() -> &'static str {
        "mock"
    }

    fn from_config(_config: Self::Config) -> AdapterResult<Self> {
        Ok(Self::new())
    }
}

// =============================================================================
// Mock Transport
// =============================================================================

struct MockTransportState {
    name: String,
    advertised: FeatureSet,
    sent: Mutex<Vec<FederatedMessage>>,
    sink: Mutex<Option<InboundSink>>,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    fail_start: AtomicBool,
    fail_sends: AtomicBool,
}

/// A transport that records published messages and lets tests inject frames.
#[derive(Clone)]
pub struct MockTransport {
    state: Arc<MockTransportState>,
}

impl MockTransport {
    pub fn new(name: impl Into<String>, advertised: FeatureSet) -> Self {
        Self {
            state: Arc::new(MockTransportState {
                name: name.into(),
                advertised,
                sent: Mutex::new(Vec::new()),
                sink: Mutex::new(None),
                connects: AtomicUsize::new(0),
                disconnects: AtomicUsize::new(0),
                fail_start: AtomicBool::new(false),
                fail_sends: AtomicBool::new(false),
            }),
        }
    }

    /// Feeds a raw frame as if it arrived from the bus.
    ///
    /// Returns whether it reached a receive handler.
    pub fn inject(&self, raw: &[u8]) -> bool {
        match self.state.sink.lock().as_ref() {
            Some(sink) => sink.deliver(raw),
            None => false,
        }
    }

    /// Feeds an encoded envelope as if it arrived from the bus.
    pub fn inject_message(&self, message: &FederatedMessage) -> bool {
        self.inject(message.to_json().as_bytes())
    }

    /// Messages published through this transport, in order.
    pub fn sent(&self) -> Vec<FederatedMessage> {
        self.state.sent.lock().clone()
    }

    pub fn connect_count(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> usize {
        self.state.disconnects.load(Ordering::SeqCst)
    }

    pub fn fail_start(&self, fail: bool) {
        self.state.fail_start.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sends(&self, fail: bool) {
        self.state.fail_sends.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TransportAdapter for MockTransport {
    fn name(&self) -> &str {
        &self.state.name
    }

    fn advertised_features(&self) -> FeatureSet {
        self.state.advertised
    }

    async fn connect(&self, inbound: InboundSink) -> AdapterResult<()> {
        if self.state.fail_start.load(Ordering::SeqCst) {
            return Err(AdapterError::connection("mock transport refused to start"));
        }
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        *self.state.sink.lock() = Some(inbound);
        Ok(())
    }

    async fn disconnect(&self) -> AdapterResult<()> {
        self.state.disconnects.fetch_add(1, Ordering::SeqCst);
        self.state.sink.lock().take();
        Ok(())
    }

    async fn publish(&self, message: &FederatedMessage) -> AdapterResult<()> {
        if self.state.fail_sends.load(Ordering::SeqCst) {
            return Err(AdapterError::connection("mock transport is offline"));
        }
        self.state.sent.lock().push(message.clone());
        Ok(())
    }
}
