//! modfed Runtime - configuration, logging and process lifecycle.
//!
//! This crate provides:
//! - Layered configuration (`ModfedConfig`, `ConfigLoader`)
//! - Logging setup from configuration (`LoggingBuilder`)
//! - Building adapters from configuration sections (`FederationRuntime`)
//! - Graceful shutdown on Ctrl+C / SIGTERM
//!
//! # Configuration
//!
//! ```toml
//! [router]
//! dedup_capacity = 1024
//!
//! [bots.panel]
//! adapter = "http"
//! port = 8080
//!
//! [transports.bus]
//! adapter = "local"
//! channel = "guild-federation"
//! features = ["send", "receive"]
//! ```
//!
//! Every bot and transport section names its `adapter` type; the remaining
//! keys are deserialized into that adapter's config type.
//!
//! ```ignore
//! use modfed_runtime::FederationRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = FederationRuntime::new();
//!     runtime.register_configured_bots::<HttpBot>()?;
//!     runtime.register_builtin_transports()?;
//!
//!     // Run until Ctrl+C
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, LoggingConfig, ModfedConfig, Profile};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;
pub use runtime::{FederationRuntime, RuntimeBuilder, wait_for_shutdown};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
