//! # Modfed Core
//!
//! Moderation action model, adapter contracts and the federation router.
//!
//! ## Layers
//!
//! - **Action model**: [`ModerationAction`] and its wire codec, plus the
//!   [`FederatedMessage`] envelope used between processes.
//! - **Contracts**: [`BotAdapter`] for moderation surfaces and
//!   [`TransportAdapter`] for message buses, each supervised by a lifecycle
//!   wrapper ([`Bot`], [`Transport`]).
//! - **Routing**: [`FederationRouter`] fans actions out from the bot they were
//!   taken on to every transport and every other bot, and from every transport
//!   to every bot.
//!
//! ```text
//!   ┌───────┐  action   ┌────────┐  envelope  ┌───────────┐
//!   │ Bot A │──────────▶│ Router │───────────▶│ Transport │
//!   └───────┘           │        │◀───────────│           │
//!   ┌───────┐  perform  │        │  envelope  └───────────┘
//!   │ Bot B │◀──────────│        │
//!   └───────┘           └────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use modfed_core::prelude::*;
//! use modfed_core::mock::{MockBot, MockTransport};
//!
//! let mut router = FederationRouter::new(RouterConfig::default());
//! router.register_bot(Bot::new("discord-main", MockBot::new()))?;
//! router.register_transport(MockTransport::new("bus", FeatureSet::SEND_RECEIVE), None)?;
//! router.run_until(async { tokio::signal::ctrl_c().await.ok(); }).await?;
//! ```

pub mod action;
pub mod bot;
pub mod envelope;
pub mod error;
pub mod lifecycle;
pub mod mock;
pub mod router;
pub mod transport;

pub use action::{ActionDraft, ActionKind, ActionPayload, ActionReason, ModerationAction};
pub use bot::{ActionCallback, ActionSink, Bot, BotAdapter, ConfigurableBot};
pub use envelope::FederatedMessage;
pub use error::{
    ActionError, ActionResult, AdapterError, AdapterResult, BotError, BotResult, RouterError,
    RouterResult, TransportError, TransportResult,
};
pub use lifecycle::{Lifecycle, LifecycleState};
pub use router::{
    ActionOrigin, ActionRecord, BotHandle, FederationRouter, RouterConfig, RouterEvent,
    TransportHandle,
};
pub use transport::{
    ConfigurableTransport, EnabledTransport, Feature, FeatureSet, InboundSink, ReceiveHandler,
    Transport, TransportAdapter, TransportId,
};

/// Prelude for common imports.
pub mod prelude {
    pub use super::action::{ActionDraft, ActionKind, ActionReason, ModerationAction};
    pub use super::bot::{ActionSink, Bot, BotAdapter, ConfigurableBot};
    pub use super::envelope::FederatedMessage;
    pub use super::error::{AdapterError, AdapterResult};
    pub use super::router::{FederationRouter, RouterConfig};
    pub use super::transport::{
        ConfigurableTransport, Feature, FeatureSet, InboundSink, TransportAdapter,
    };
}
