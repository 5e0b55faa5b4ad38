//! Configuration loading and validation.
//!
//! Files, environment variables and programmatic overrides are layered with
//! figment into a [`ModfedConfig`]. Bot and transport sections stay untyped
//! until the runtime deserializes them into the adapter's own config type.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, ModfedConfig, section_adapter,
    section_features,
};
pub use validation::validate_config;
