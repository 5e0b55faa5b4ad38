//! In-process broadcast bus.
//!
//! A [`LocalHub`] is a `tokio::sync::broadcast` channel shared by any number
//! of [`LocalBus`] endpoints. Every endpoint sees every frame published by the
//! other endpoints on the same hub, never its own.
//!
//! Named hubs live in a process-wide registry so that independently configured
//! runtimes in one process federate by naming the same `channel`:
//!
//! ```text
//! "guild-federation"
//! ├── LocalBus "bus" (runtime A)
//! └── LocalBus "bus" (runtime B)
//! ```
//!
//! A named hub is dropped once its last endpoint is dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use modfed_core::{
    AdapterError, AdapterResult, ConfigurableTransport, FeatureSet, FederatedMessage, InboundSink,
    TransportAdapter,
};

const DEFAULT_CAPACITY: usize = 1024;

static NEXT_ENDPOINT_ID: AtomicU64 = AtomicU64::new(1);

static HUB_REGISTRY: LazyLock<Mutex<HashMap<String, Weak<HubInner>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

#[derive(Clone)]
struct Frame {
    origin: u64,
    payload: Arc<str>,
}

struct HubInner {
    channel: String,
    sender: broadcast::Sender<Frame>,
}

/// A broadcast channel shared by [`LocalBus`] endpoints.
#[derive(Clone)]
pub struct LocalHub {
    inner: Arc<HubInner>,
}

impl LocalHub {
    /// Creates an anonymous hub, reachable only through its endpoints.
    pub fn new(capacity: usize) -> Self {
        Self::create("", capacity)
    }

    /// Returns the live hub named `channel`, creating one if needed.
    ///
    /// `capacity` only applies when the hub is created.
    pub fn named(channel: &str, capacity: usize) -> Self {
        let mut registry = HUB_REGISTRY.lock();
        if let Some(inner) = registry.get(channel).and_then(Weak::upgrade) {
            return Self { inner };
        }

        registry.retain(|_, hub| hub.strong_count() > 0);
        let hub = Self::create(channel, capacity);
        registry.insert(channel.to_string(), Arc::downgrade(&hub.inner));
        debug!(channel = %channel, capacity, "Created local hub");
        hub
    }

    fn create(channel: &str, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(HubInner {
                channel: channel.to_string(),
                sender,
            }),
        }
    }

    /// Channel name; empty for anonymous hubs.
    pub fn channel(&self) -> &str {
        &self.inner.channel
    }

    /// Creates a new endpoint on this hub.
    pub fn endpoint(&self, name: impl Into<String>) -> LocalBus {
        LocalBus {
            name: name.into(),
            endpoint_id: NEXT_ENDPOINT_ID.fetch_add(1, Ordering::Relaxed),
            hub: self.clone(),
            worker: Mutex::new(None),
        }
    }

    /// Number of connected endpoints.
    pub fn subscriber_count(&self) -> usize {
        self.inner.sender.receiver_count()
    }
}

// =============================================================================
// LocalBus
// =============================================================================

struct Worker {
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// One endpoint on a [`LocalHub`].
pub struct LocalBus {
    name: String,
    endpoint_id: u64,
    hub: LocalHub,
    worker: Mutex<Option<Worker>>,
}

impl LocalBus {
    pub fn hub(&self) -> &LocalHub {
        &self.hub
    }

    pub fn is_connected(&self) -> bool {
        self.worker.lock().is_some()
    }
}

/// Configuration for a `local` transport section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocalBusConfig {
    /// Hub name; transports naming the same channel share frames.
    pub channel: String,
    /// Frames buffered per endpoint before slow readers start lagging.
    pub capacity: usize,
}

impl Default for LocalBusConfig {
    fn default() -> Self {
        Self {
            channel: "default".to_string(),
            capacity: DEFAULT_CAPACITY,
        }
    }
}

#[async_trait]
impl TransportAdapter for LocalBus {
    fn name(&self) -> &str {
        &self.name
    }

    fn advertised_features(&self) -> FeatureSet {
        FeatureSet::SEND_RECEIVE
    }

    async fn connect(&self, inbound: InboundSink) -> AdapterResult<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Ok(());
        }

        let rx = self.hub.inner.sender.subscribe();
        let token = CancellationToken::new();
        let task = tokio::spawn(receive_loop(
            rx,
            inbound,
            token.clone(),
            self.name.clone(),
            self.endpoint_id,
        ));
        *worker = Some(Worker { token, task });

        info!(transport = %self.name, channel = %self.hub.channel(), "Local bus connected");
        Ok(())
    }

    async fn disconnect(&self) -> AdapterResult<()> {
        let worker = self.worker.lock().take();
        let Some(Worker { token, task }) = worker else {
            return Ok(());
        };

        token.cancel();
        if let Err(e) = task.await {
            warn!(transport = %self.name, error = %e, "Local bus receive task ended abnormally");
        }
        info!(transport = %self.name, channel = %self.hub.channel(), "Local bus disconnected");
        Ok(())
    }

    async fn publish(&self, message: &FederatedMessage) -> AdapterResult<()> {
        let frame = Frame {
            origin: self.endpoint_id,
            payload: message.to_json().into(),
        };
        match self.hub.inner.sender.send(frame) {
            Ok(receivers) => {
                trace!(transport = %self.name, receivers, "Published frame");
            }
            Err(_) => {
                debug!(transport = %self.name, "No endpoints listening, frame dropped");
            }
        }
        Ok(())
    }
}

impl ConfigurableTransport for LocalBus {
    type Config = LocalBusConfig;

    fn adapter_name() -> &'static str {
        "local"
    }

    fn from_config(name: &str, config: Self::Config) -> AdapterResult<Self> {
        if config.capacity == 0 {
            return Err(AdapterError::invalid_config(format!(
                "transport '{name}': capacity must be greater than 0"
            )));
        }
        Ok(LocalHub::named(&config.channel, config.capacity).endpoint(name))
    }
}

async fn receive_loop(
    mut rx: broadcast::Receiver<Frame>,
    inbound: InboundSink,
    token: CancellationToken,
    name: String,
    endpoint_id: u64,
) {
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            frame = rx.recv() => match frame {
                Ok(frame) if frame.origin == endpoint_id => {}
                Ok(frame) => {
                    inbound.deliver(frame.payload.as_bytes());
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(transport = %name, skipped, "Local bus lagged, frames lost");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
    debug!(transport = %name, "Local bus receive loop exited");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use modfed_core::{ActionDraft, ActionReason, ModerationAction, Transport, TransportId};
    use tokio::sync::mpsc;

    use super::*;

    fn message(target: &str) -> FederatedMessage {
        let action = ModerationAction::create(
            "ban",
            ActionDraft::new(target, "M1", "spam", ActionReason::Spam),
        )
        .unwrap();
        FederatedMessage::new(action, "G1")
    }

    fn listen(transport: &Transport) -> mpsc::UnboundedReceiver<FederatedMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        transport.set_receive_handler(Arc::new(move |message: FederatedMessage, _: TransportId| {
            let _ = tx.send(message);
        }));
        rx
    }

    async fn recv(rx: &mut mpsc::UnboundedReceiver<FederatedMessage>) -> FederatedMessage {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_frames_reach_other_endpoints_only() {
        let hub = LocalHub::new(16);
        let a = Transport::new(hub.endpoint("a"));
        let b = Transport::new(hub.endpoint("b"));
        let mut a_rx = listen(&a);
        let mut b_rx = listen(&b);

        a.start().await.unwrap();
        b.start().await.unwrap();
        assert_eq!(hub.subscriber_count(), 2);

        let sent = message("U1");
        a.send(&sent).await.unwrap();
        assert_eq!(recv(&mut b_rx).await.message_id(), sent.message_id());

        b.send(&message("U2")).await.unwrap();
        let echoed = recv(&mut a_rx).await;
        assert_eq!(echoed.action().target_user_id(), "U2");
        assert!(a_rx.try_recv().is_err());

        a.stop().await.unwrap();
        b.stop().await.unwrap();
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_publish_without_listeners() {
        let hub = LocalHub::new(4);
        let bus = hub.endpoint("lonely");
        assert!(bus.publish(&message("U1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_named_hubs_are_shared() {
        let first = LocalHub::named("local-test-shared", 8);
        let second = LocalHub::named("local-test-shared", 64);
        assert!(Arc::ptr_eq(&first.inner, &second.inner));
        assert_eq!(second.channel(), "local-test-shared");

        let other = LocalHub::named("local-test-other", 8);
        assert!(!Arc::ptr_eq(&first.inner, &other.inner));
    }

    #[tokio::test]
    async fn test_reconnect_is_idempotent() {
        let hub = LocalHub::new(4);
        let transport = Transport::new(hub.endpoint("bus"));

        transport.start().await.unwrap();
        transport.start().await.unwrap();
        assert_eq!(hub.subscriber_count(), 1);

        transport.stop().await.unwrap();
        transport.stop().await.unwrap();
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_from_config() {
        let bus = LocalBus::from_config("bus", LocalBusConfig::default()).unwrap();
        assert_eq!(bus.name(), "bus");
        assert_eq!(bus.hub().channel(), "default");
        assert_eq!(bus.advertised_features(), FeatureSet::SEND_RECEIVE);

        let config = LocalBusConfig {
            capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            LocalBus::from_config("bus", config),
            Err(AdapterError::InvalidConfig(_))
        ));
    }
}
