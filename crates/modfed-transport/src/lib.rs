//! # modfed Transport
//!
//! Message bus implementations of [`modfed_core::TransportAdapter`].
//!
//! ## Features
//!
//! - `ws-client`: WebSocket relay client ([`WsRelay`])
//!
//! ## Transports
//!
//! | Adapter | Type | Use Case |
//! |---------|------|----------|
//! | `local` | [`LocalBus`] | Processes sharing one address space, tests |
//! | `ws-client` | `WsRelay` | Federating through a relay server |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use modfed_transport::LocalHub;
//!
//! let hub = LocalHub::named("guild-federation", 1024);
//! router.register_transport(hub.endpoint("bus"), None)?;
//! ```

pub mod local;

#[cfg(feature = "ws-client")]
pub mod websocket;

pub use local::{LocalBus, LocalBusConfig, LocalHub};

#[cfg(feature = "ws-client")]
pub use websocket::{WsRelay, WsRelayConfig};
