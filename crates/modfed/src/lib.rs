//! # modfed
//!
//! Federated moderation for community platforms.
//!
//! ## Overview
//!
//! A moderation action taken on one surface (a chat server, a web panel) is
//! applied on every other surface in the federation. Each process runs a
//! router that connects its local bots to one or more transports:
//!
//! ```text
//! ┌───────────┐     ┌────────┐     ┌───────────┐     ┌────────┐     ┌───────────┐
//! │ HTTP bot  │────▶│ Router │────▶│ Transport │────▶│ Router │────▶│ Other bot │
//! └───────────┘     └────────┘     └───────────┘     └────────┘     └───────────┘
//! ```
//!
//! - **Bots**: moderation surfaces that report and enforce actions
//! - **Transports**: message buses carrying encoded actions between processes
//! - **Router**: fans actions out, never echoing one back to its source bot
//! - **Runtime**: configuration, logging and the process lifecycle
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use modfed::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = FederationRuntime::new();
//!     runtime.register_configured_bots::<HttpBot>()?;
//!     runtime.register_builtin_transports()?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `http`: HTTP form bot adapter (default)
//! - `toml-config` / `yaml-config`: configuration file formats
//! - `json-log`: JSON log output
//! - `ws-client`: WebSocket relay transport

pub use modfed_core as core;
pub use modfed_runtime as runtime;
pub use modfed_transport as transport;

#[cfg(feature = "http")]
pub use modfed_adapter_http as http;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use modfed::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use modfed_runtime::{FederationRuntime, RuntimeBuilder, RuntimeError, RuntimeResult};

    // Action model
    pub use modfed_core::{
        ActionDraft, ActionKind, ActionPayload, ActionReason, FederatedMessage, ModerationAction,
    };

    // Adapter contracts - for custom bots and transports
    pub use modfed_core::{
        ActionSink, AdapterError, AdapterResult, BotAdapter, ConfigurableBot,
        ConfigurableTransport, Feature, FeatureSet, InboundSink, TransportAdapter,
    };

    // Routing
    pub use modfed_core::{FederationRouter, RouterConfig};

    // Built-in transports
    pub use modfed_transport::{LocalBus, LocalHub};

    #[cfg(feature = "ws-client")]
    pub use modfed_transport::WsRelay;

    #[cfg(feature = "http")]
    pub use modfed_adapter_http::HttpBot;
}
