//! WebSocket relay client.
//!
//! Connects to a relay server that re-broadcasts every frame to the other
//! connected clients. Envelopes go out as text frames; text and binary frames
//! coming in are both decoded as envelopes.
//!
//! The connection is not re-established when the relay closes it; publishing
//! fails until the transport is restarted.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use modfed_core::{
    AdapterError, AdapterResult, ConfigurableTransport, FeatureSet, FederatedMessage, InboundSink,
    TransportAdapter,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

const OUTBOUND_CAPACITY: usize = 256;

/// Configuration for a `ws-client` transport section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WsRelayConfig {
    /// Relay server URL, `ws://` or `wss://`.
    pub url: String,
}

struct RelayWorker {
    outbound: mpsc::Sender<String>,
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// A transport that federates through a WebSocket relay server.
pub struct WsRelay {
    name: String,
    url: String,
    worker: Mutex<Option<RelayWorker>>,
}

impl WsRelay {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            worker: Mutex::new(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TransportAdapter for WsRelay {
    fn name(&self) -> &str {
        &self.name
    }

    fn advertised_features(&self) -> FeatureSet {
        FeatureSet::SEND_RECEIVE
    }

    async fn connect(&self, inbound: InboundSink) -> AdapterResult<()> {
        if self.worker.lock().is_some() {
            return Ok(());
        }

        info!(transport = %self.name, url = %self.url, "Connecting to relay");
        let (ws_stream, _response) = connect_async(self.url.as_str()).await.map_err(|e| {
            AdapterError::connection(format!("WebSocket connection to {} failed: {e}", self.url))
        })?;
        let (ws_tx, ws_rx) = ws_stream.split();

        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let token = CancellationToken::new();
        let task = tokio::spawn(run_relay_loop(
            ws_tx,
            ws_rx,
            outbound_rx,
            inbound,
            token.clone(),
            self.name.clone(),
        ));
        *self.worker.lock() = Some(RelayWorker {
            outbound,
            token,
            task,
        });

        info!(transport = %self.name, url = %self.url, "Relay connected");
        Ok(())
    }

    async fn disconnect(&self) -> AdapterResult<()> {
        let worker = self.worker.lock().take();
        let Some(RelayWorker { token, task, .. }) = worker else {
            return Ok(());
        };

        token.cancel();
        if let Err(e) = task.await {
            warn!(transport = %self.name, error = %e, "Relay task ended abnormally");
        }
        info!(transport = %self.name, "Relay disconnected");
        Ok(())
    }

    async fn publish(&self, message: &FederatedMessage) -> AdapterResult<()> {
        let outbound = self
            .worker
            .lock()
            .as_ref()
            .map(|worker| worker.outbound.clone())
            .ok_or_else(|| AdapterError::connection("relay is not connected"))?;

        outbound
            .send(message.to_json())
            .await
            .map_err(|_| AdapterError::connection("relay connection closed"))
    }
}

impl ConfigurableTransport for WsRelay {
    type Config = WsRelayConfig;

    fn adapter_name() -> &'static str {
        "ws-client"
    }

    fn from_config(name: &str, config: Self::Config) -> AdapterResult<Self> {
        if !(config.url.starts_with("ws://") || config.url.starts_with("wss://")) {
            return Err(AdapterError::invalid_config(format!(
                "transport '{name}': url must start with ws:// or wss://, got '{}'",
                config.url
            )));
        }
        Ok(Self::new(name, config.url))
    }
}

async fn run_relay_loop(
    mut ws_tx: WsSink,
    mut ws_rx: WsSource,
    mut outbound: mpsc::Receiver<String>,
    inbound: InboundSink,
    token: CancellationToken,
    name: String,
) {
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                let _ = ws_tx.close().await;
                break;
            }

            Some(text) = outbound.recv() => {
                if let Err(e) = ws_tx.send(Message::Text(text.into())).await {
                    warn!(transport = %name, error = %e, "Failed to send frame");
                }
            }

            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    trace!(transport = %name, len = text.len(), "Received text");
                    inbound.deliver(text.as_bytes());
                }
                Some(Ok(Message::Binary(data))) => {
                    trace!(transport = %name, len = data.len(), "Received binary");
                    inbound.deliver(&data);
                }
                Some(Ok(Message::Ping(data))) => {
                    let _ = ws_tx.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
                Some(Ok(Message::Close(_))) => {
                    warn!(transport = %name, "Relay closed the connection");
                    break;
                }
                Some(Err(e)) => {
                    warn!(transport = %name, error = %e, "Relay connection error");
                    break;
                }
                None => {
                    warn!(transport = %name, "Relay stream ended");
                    break;
                }
            },
        }
    }
    debug!(transport = %name, "Relay loop exited");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use modfed_core::{ActionDraft, ActionReason, ModerationAction, Transport, TransportId};
    use tokio::net::TcpListener;

    use super::*;

    fn message(target: &str) -> FederatedMessage {
        let action = ModerationAction::create(
            "kick",
            ActionDraft::new(target, "M1", "flooding", ActionReason::DisruptiveBehavior),
        )
        .unwrap();
        FederatedMessage::new(action, "G1")
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<FederatedMessage>) -> FederatedMessage {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_from_config_requires_ws_url() {
        let config = WsRelayConfig {
            url: "wss://relay.example/federation".into(),
        };
        let relay = WsRelay::from_config("relay", config).unwrap();
        assert_eq!(relay.url(), "wss://relay.example/federation");

        for url in ["", "http://relay.example"] {
            let config = WsRelayConfig { url: url.into() };
            assert!(matches!(
                WsRelay::from_config("relay", config),
                Err(AdapterError::InvalidConfig(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_publish_requires_connection() {
        let relay = WsRelay::new("relay", "ws://127.0.0.1:9");
        assert!(relay.publish(&message("U1")).await.is_err());
    }

    #[tokio::test]
    async fn test_round_trip_through_echo_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let pushed = message("U-pushed");
        let pushed_json = pushed.to_json();

        // Pushes one binary frame, then echoes text frames back.
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(Message::Binary(pushed_json.into_bytes().into()))
                .await
                .unwrap();
            while let Some(Ok(frame)) = ws.next().await {
                if frame.is_text() && ws.send(frame).await.is_err() {
                    break;
                }
            }
        });

        let transport = Transport::new(WsRelay::new("relay", format!("ws://{addr}")));
        let (tx, mut rx) = mpsc::unbounded_channel();
        transport.set_receive_handler(Arc::new(move |message: FederatedMessage, _: TransportId| {
            let _ = tx.send(message);
        }));
        transport.start().await.unwrap();

        let first = next(&mut rx).await;
        assert_eq!(first.message_id(), pushed.message_id());

        let sent = message("U-echo");
        transport.send(&sent).await.unwrap();
        let echoed = next(&mut rx).await;
        assert_eq!(echoed.message_id(), sent.message_id());

        transport.stop().await.unwrap();
    }
}
