//! Transport contract.
//!
//! A [`TransportAdapter`] moves [`FederatedMessage`] envelopes between
//! processes. The [`Transport`] wrapper owns the adapter, supervises its
//! lifecycle and decodes inbound frames before handing them to the registered
//! [`ReceiveHandler`].
//!
//! Inbound frames reach the wrapper through an [`InboundSink`], which the
//! adapter receives in [`TransportAdapter::connect`]. Frames that fail to
//! decode are logged and dropped; they never reach the handler.

mod enabled;
mod feature;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::envelope::FederatedMessage;
use crate::error::{AdapterResult, TransportError, TransportResult};
use crate::lifecycle::{Lifecycle, LifecycleState};

pub use enabled::EnabledTransport;
pub use feature::{Feature, FeatureSet};

/// Callback invoked for every successfully decoded inbound message.
///
/// Handlers run on the adapter's receive task and must not block; the router's
/// handler only enqueues.
pub type ReceiveHandler = Arc<dyn Fn(FederatedMessage, TransportId) + Send + Sync>;

static NEXT_TRANSPORT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a [`Transport`] instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransportId(u64);

impl TransportId {
    fn next() -> Self {
        Self(NEXT_TRANSPORT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TransportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transport#{}", self.0)
    }
}

// =============================================================================
// Adapter Traits
// =============================================================================

/// A concrete message-bus implementation.
#[async_trait]
pub trait TransportAdapter: Send + Sync + 'static {
    /// Instance name used in logs and errors.
    fn name(&self) -> &str;

    /// Features this transport is able to provide.
    fn advertised_features(&self) -> FeatureSet;

    /// Connects to the bus. Inbound frames are fed to `inbound`.
    async fn connect(&self, inbound: InboundSink) -> AdapterResult<()>;

    /// Disconnects from the bus.
    async fn disconnect(&self) -> AdapterResult<()>;

    /// Publishes one encoded envelope.
    async fn publish(&self, message: &FederatedMessage) -> AdapterResult<()>;
}

/// A transport adapter that can be built from a configuration section.
pub trait ConfigurableTransport: TransportAdapter + Sized {
    /// Configuration type, deserialized from `transports.<name>`.
    type Config: DeserializeOwned + Default;

    /// Adapter type name, e.g. `"local"`.
    fn adapter_name() -> &'static str;

    /// Creates a transport instance called `name` from its configuration.
    fn from_config(name: &str, config: Self::Config) -> AdapterResult<Self>;
}

// =============================================================================
// Transport
// =============================================================================

struct TransportInner {
    id: TransportId,
    adapter: Arc<dyn TransportAdapter>,
    advertised: FeatureSet,
    lifecycle: Lifecycle,
    handler: RwLock<Option<ReceiveHandler>>,
}

impl TransportInner {
    fn on_frame(&self, raw: &[u8]) -> bool {
        let message = match FederatedMessage::from_slice(raw) {
            Ok(message) => message,
            Err(e) => {
                warn!(
                    transport = %self.adapter.name(),
                    error = %e,
                    "Dropping undecodable inbound frame"
                );
                return false;
            }
        };

        let handler = self.handler.read().clone();
        match handler {
            Some(handler) => {
                debug!(transport = %self.adapter.name(), message = %message, "Inbound message");
                handler(message, self.id);
                true
            }
            None => {
                debug!(
                    transport = %self.adapter.name(),
                    "No receive handler set, dropping inbound message"
                );
                false
            }
        }
    }
}

/// Lifecycle wrapper around a [`TransportAdapter`].
///
/// Cloning is cheap; clones share the adapter and state.
#[derive(Clone)]
pub struct Transport {
    inner: Arc<TransportInner>,
}

impl Transport {
    pub fn new(adapter: impl TransportAdapter) -> Self {
        Self::from_arc(Arc::new(adapter))
    }

    pub fn from_arc(adapter: Arc<dyn TransportAdapter>) -> Self {
        Self {
            inner: Arc::new(TransportInner {
                id: TransportId::next(),
                advertised: adapter.advertised_features(),
                adapter,
                lifecycle: Lifecycle::new(),
                handler: RwLock::new(None),
            }),
        }
    }

    pub fn id(&self) -> TransportId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        self.inner.adapter.name()
    }

    /// Features the adapter advertised at construction.
    pub fn advertised_features(&self) -> FeatureSet {
        self.inner.advertised
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.lifecycle.state()
    }

    pub fn is_running(&self) -> bool {
        self.inner.lifecycle.is_running()
    }

    /// Returns a sink that feeds raw frames into this transport.
    pub fn inbound_sink(&self) -> InboundSink {
        InboundSink {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Connects the adapter. Idempotent while running.
    ///
    /// Returns `Ok(false)` if a start or stop is already in flight.
    pub async fn start(&self) -> TransportResult<bool> {
        let adapter = Arc::clone(&self.inner.adapter);
        let sink = self.inbound_sink();
        let started = self
            .inner
            .lifecycle
            .start_with(|| async move { adapter.connect(sink).await })
            .await?;
        if started {
            info!(transport = %self.name(), "Transport started");
        }
        Ok(started)
    }

    /// Disconnects the adapter. Idempotent while stopped.
    pub async fn stop(&self) -> TransportResult<bool> {
        let adapter = Arc::clone(&self.inner.adapter);
        let stopped = self
            .inner
            .lifecycle
            .stop_with(|| async move { adapter.disconnect().await })
            .await?;
        if stopped {
            info!(transport = %self.name(), "Transport stopped");
        }
        Ok(stopped)
    }

    /// Publishes `message` through the adapter.
    pub async fn send(&self, message: &FederatedMessage) -> TransportResult<()> {
        if !self.is_running() {
            return Err(TransportError::NotRunning {
                transport: self.name().to_string(),
            });
        }
        self.inner
            .adapter
            .publish(message)
            .await
            .map_err(|e| TransportError::SendFailed {
                transport: self.name().to_string(),
                reason: e.to_string(),
            })
    }

    /// Replaces the receive handler.
    pub fn set_receive_handler(&self, handler: ReceiveHandler) {
        *self.inner.handler.write() = Some(handler);
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("state", &self.state())
            .finish()
    }
}

/// Entry point for raw inbound frames.
///
/// Holds a weak reference: once the owning [`Transport`] is dropped, frames
/// are discarded.
#[derive(Clone)]
pub struct InboundSink {
    inner: Weak<TransportInner>,
}

impl InboundSink {
    /// Decodes `raw` and hands it to the receive handler.
    ///
    /// Returns whether the message reached a handler.
    pub fn deliver(&self, raw: &[u8]) -> bool {
        match self.inner.upgrade() {
            Some(inner) => inner.on_frame(raw),
            None => false,
        }
    }

    /// Returns whether the owning transport still exists.
    pub fn is_attached(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl fmt::Debug for InboundSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InboundSink")
            .field("attached", &self.is_attached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionDraft, ActionReason, ModerationAction};
    use crate::mock::MockTransport;
    use parking_lot::Mutex;

    fn message() -> FederatedMessage {
        let action = ModerationAction::create(
            "kick",
            ActionDraft::new("U1", "M1", "noise", ActionReason::Spam),
        )
        .unwrap();
        FederatedMessage::new(action, "bot-a")
    }

    #[tokio::test]
    async fn test_send_requires_running() {
        let mock = MockTransport::new("bus", FeatureSet::SEND_RECEIVE);
        let transport = Transport::new(mock.clone());

        let err = transport.send(&message()).await.unwrap_err();
        assert!(matches!(err, TransportError::NotRunning { .. }));

        assert!(transport.start().await.unwrap());
        transport.send(&message()).await.unwrap();
        assert_eq!(mock.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_publish_failure_is_send_failed() {
        let mock = MockTransport::new("bus", FeatureSet::SEND_RECEIVE);
        let transport = Transport::new(mock.clone());
        transport.start().await.unwrap();

        mock.fail_sends(true);
        let err = transport.send(&message()).await.unwrap_err();
        assert!(matches!(err, TransportError::SendFailed { .. }));
    }

    #[tokio::test]
    async fn test_start_and_stop_are_idempotent() {
        let mock = MockTransport::new("bus", FeatureSet::SEND_RECEIVE);
        let transport = Transport::new(mock.clone());

        transport.start().await.unwrap();
        transport.start().await.unwrap();
        assert_eq!(mock.connect_count(), 1);

        transport.stop().await.unwrap();
        transport.stop().await.unwrap();
        assert_eq!(mock.disconnect_count(), 1);
        assert_eq!(transport.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn test_inbound_decoding() {
        let mock = MockTransport::new("bus", FeatureSet::SEND_RECEIVE);
        let transport = Transport::new(mock.clone());
        transport.start().await.unwrap();

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        transport.set_receive_handler(Arc::new(move |message: FederatedMessage, origin: TransportId| {
            sink.lock().push((message, origin));
        }));

        let sent = message();
        assert!(mock.inject(sent.to_json().as_bytes()));
        assert!(!mock.inject(b"{not json"));
        assert!(!mock.inject(br#"{"action": {"kind": "MUTE"}}"#));

        let received = received.lock();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].0, sent);
        assert_eq!(received[0].1, transport.id());
    }

    #[tokio::test]
    async fn test_sink_detaches_when_transport_dropped() {
        let mock = MockTransport::new("bus", FeatureSet::RECEIVE);
        let transport = Transport::new(mock.clone());
        let sink = transport.inbound_sink();
        assert!(sink.is_attached());

        drop(transport);
        assert!(!sink.is_attached());
        assert!(!sink.deliver(message().to_json().as_bytes()));
    }
}
