//! Configuration schema definitions.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;

use figment::value::Value;
use modfed_core::{FeatureSet, RouterConfig};
use serde::{Deserialize, Serialize};

/// Root configuration structure.
///
/// ```toml
/// [logging]
/// level = "debug"
///
/// [router]
/// dedup_capacity = 1024
///
/// [bots.web-panel]
/// adapter = "http"
/// port = 8080
///
/// [transports.bus]
/// adapter = "local"
/// features = ["send", "receive"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModfedConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub router: RouterConfig,

    /// Bot sections keyed by bot identity.
    #[serde(default)]
    pub bots: BTreeMap<String, Value>,

    /// Transport sections keyed by transport name.
    #[serde(default)]
    pub transports: BTreeMap<String, Value>,
}

impl ModfedConfig {
    /// Identities of the bots configured with the given adapter type.
    pub fn bots_with_adapter<'a>(&'a self, adapter: &'a str) -> impl Iterator<Item = &'a str> {
        sections_with_adapter(&self.bots, adapter)
    }

    /// Names of the transports configured with the given adapter type.
    pub fn transports_with_adapter<'a>(
        &'a self,
        adapter: &'a str,
    ) -> impl Iterator<Item = &'a str> {
        sections_with_adapter(&self.transports, adapter)
    }
}

fn sections_with_adapter<'a>(
    sections: &'a BTreeMap<String, Value>,
    adapter: &'a str,
) -> impl Iterator<Item = &'a str> {
    sections
        .iter()
        .filter(move |(_, section)| section_adapter(section) == Some(adapter))
        .map(|(key, _)| key.as_str())
}

/// Returns the `adapter` key of a bot or transport section.
pub fn section_adapter(section: &Value) -> Option<&str> {
    section.find_ref("adapter").and_then(Value::as_str)
}

/// Returns the `features` key of a transport section, if present.
pub fn section_features(section: &Value) -> Result<Option<FeatureSet>, figment::Error> {
    section
        .find_ref("features")
        .map(|features| features.deserialize::<FeatureSet>())
        .transpose()
}

// =============================================================================
// Logging
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base log level. `RUST_LOG` takes precedence when set.
    pub level: LogLevel,

    pub format: LogFormat,

    pub output: LogOutput,

    /// Log file, required when `output = "file"`.
    pub file_path: Option<PathBuf>,

    /// How often the log file rolls over.
    pub rotation: LogRotation,

    /// Include thread ids in log lines.
    pub thread_ids: bool,

    /// Include source file and line in log lines.
    pub file_location: bool,

    /// Per-module levels, e.g. `modfed_core = "debug"`.
    pub filters: HashMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            file_path: None,
            rotation: LogRotation::Never,
            thread_ids: false,
            file_location: false,
            filters: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to compact otherwise.
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
logging:
  level: debug
  format: pretty
  filters:
    modfed_core: trace
router:
  dedup_capacity: 64
bots:
  web-panel:
    adapter: http
    port: 8080
  other:
    adapter: mock
transports:
  bus:
    adapter: local
    features: [receive]
"#;

    #[test]
    fn test_parse_yaml() {
        let config: ModfedConfig = serde_yaml::from_str(YAML).unwrap();

        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.logging.filters["modfed_core"], LogLevel::Trace);
        assert_eq!(config.router.dedup_capacity, Some(64));
        assert_eq!(config.router.history_capacity, 256);
        assert_eq!(config.bots.len(), 2);
    }

    #[test]
    fn test_sections_by_adapter() {
        let config: ModfedConfig = serde_yaml::from_str(YAML).unwrap();

        let http: Vec<_> = config.bots_with_adapter("http").collect();
        assert_eq!(http, ["web-panel"]);
        let local: Vec<_> = config.transports_with_adapter("local").collect();
        assert_eq!(local, ["bus"]);

        let bus = &config.transports["bus"];
        assert_eq!(section_features(bus).unwrap(), Some(FeatureSet::RECEIVE));
        assert_eq!(section_features(&config.bots["other"]).unwrap(), None);
    }

    #[test]
    fn test_defaults() {
        let config = ModfedConfig::default();
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.output, LogOutput::Stdout);
        assert!(config.bots.is_empty());
    }
}
