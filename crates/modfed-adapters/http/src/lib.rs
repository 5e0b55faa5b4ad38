//! # modfed HTTP adapter
//!
//! A bot whose moderation surface is a web form served with axum. Moderators
//! submit actions through `POST /action`; actions routed to the bot from
//! elsewhere are listed on `GET /action`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use modfed_adapter_http::HttpBot;
//! use modfed_runtime::FederationRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = FederationRuntime::new();
//!     runtime.register_configured_bots::<HttpBot>()?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Submitting an Action
//!
//! ```text
//! curl -d action_type=ban -d target_user_id=U1 -d action_moderator_id=M1 \
//!      -d action_reason=spam -d action_reason_type=spam \
//!      http://127.0.0.1:8080/action
//! ```

pub mod bot;
pub mod config;
pub mod form;

pub use bot::HttpBot;
pub use config::HttpBotConfig;
pub use form::{ActionForm, FormError};
