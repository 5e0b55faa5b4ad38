//! Runtime error types.

use thiserror::Error;

pub use crate::config::{ConfigError, ConfigResult};

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// An adapter's configuration section could not be deserialized.
    #[error("Failed to deserialize adapter config: {0}")]
    AdapterConfigDeserialize(String),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Adapter error.
    #[error("Adapter error: {0}")]
    Adapter(#[from] modfed_core::AdapterError),

    /// Router error.
    #[error("Router error: {0}")]
    Router(#[from] modfed_core::RouterError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
