//! Unified error types for the modfed core.
//!
//! Each layer has its own error enum so that callers can tell apart a bad
//! payload, a misconfigured adapter, a misused transport and a misused router.

use thiserror::Error;

use crate::transport::{Feature, FeatureSet};

// =============================================================================
// Action Model Errors
// =============================================================================

/// Errors raised while constructing or decoding a moderation action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// The kind is not one of the recognised action kinds.
    #[error("unknown action kind: '{0}'")]
    UnknownActionKind(String),

    /// A field required for this kind is absent.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The text is not a valid encoding.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

impl ActionError {
    /// Creates a malformed payload error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPayload(reason.into())
    }
}

impl From<serde_json::Error> for ActionError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedPayload(err.to_string())
    }
}

// =============================================================================
// Adapter Errors
// =============================================================================

/// Errors reported by bot and transport adapters.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    /// Adapter configuration has the wrong shape or fails validation.
    #[error("invalid adapter configuration: {0}")]
    InvalidConfig(String),

    /// Connecting to, or talking to, the underlying surface failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// Internal adapter error.
    #[error("adapter error: {0}")]
    Internal(String),

    /// An action could not be built or decoded.
    #[error(transparent)]
    Action(#[from] ActionError),
}

impl AdapterError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Creates a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates an internal adapter error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<std::io::Error> for AdapterError {
    fn from(err: std::io::Error) -> Self {
        Self::Connection(err.to_string())
    }
}

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors raised by the transport contract.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The transport is not in the running state.
    #[error("transport '{transport}' is not running")]
    NotRunning {
        /// Transport name.
        transport: String,
    },

    /// The transport is disabled or the feature is not in its permitted set.
    #[error("feature '{feature}' is not permitted on transport '{transport}'")]
    FeatureNotPermitted {
        /// Transport name.
        transport: String,
        /// The rejected feature.
        feature: Feature,
    },

    /// The transport does not advertise the feature.
    #[error("feature '{feature}' is not available on transport '{transport}'")]
    FeatureUnavailable {
        /// Transport name.
        transport: String,
        /// The unavailable feature.
        feature: Feature,
    },

    /// The transport is administratively disabled.
    #[error("transport '{transport}' is disabled")]
    Disabled {
        /// Transport name.
        transport: String,
    },

    /// The adapter failed to publish a message.
    #[error("transport '{transport}' failed to send: {reason}")]
    SendFailed {
        /// Transport name.
        transport: String,
        /// Reason for failure.
        reason: String,
    },

    /// Adapter error during start or stop.
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

// =============================================================================
// Bot Errors
// =============================================================================

/// Errors raised by the bot contract.
#[derive(Debug, Clone, Error)]
pub enum BotError {
    /// The bot is not in the running state.
    #[error("bot '{bot}' is not running")]
    NotRunning {
        /// Bot identity.
        bot: String,
    },

    /// Adapter error.
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

// =============================================================================
// Router Errors
// =============================================================================

/// Errors raised by the federation router.
#[derive(Debug, Clone, Error)]
pub enum RouterError {
    /// The bot cannot be registered (empty or duplicate identity).
    #[error("invalid bot: {0}")]
    InvalidBot(String),

    /// Bots and transports can only be registered before `start()`.
    #[error("cannot register components after the router has started")]
    RegistrationAfterStart,

    /// Requested features are not a subset of the advertised ones.
    #[error(
        "invalid feature set for transport '{transport}': requested {requested}, advertised {advertised}"
    )]
    InvalidFeatureSet {
        /// Transport name.
        transport: String,
        /// Requested features.
        requested: FeatureSet,
        /// Advertised features.
        advertised: FeatureSet,
    },

    /// A component failed to start.
    #[error("startup failed at '{component}': {reason}")]
    StartupFailed {
        /// Name of the first failing component.
        component: String,
        /// Reason for failure.
        reason: String,
    },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for action model operations.
pub type ActionResult<T> = Result<T, ActionError>;

/// Result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for bot operations.
pub type BotResult<T> = Result<T, BotError>;

/// Result type for router operations.
pub type RouterResult<T> = Result<T, RouterError>;
