//! Configuration for the HTTP bot.
//!
//! # Example Configuration
//!
//! ```toml
//! [bots.panel]
//! adapter = "http"
//! host = "0.0.0.0"
//! port = 8080
//! max_listed_actions = 100
//! ```

use serde::{Deserialize, Serialize};

/// HTTP bot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpBotConfig {
    /// Bind host.
    pub host: String,

    /// Bind port; `0` picks an ephemeral port.
    pub port: u16,

    /// How many executed actions are kept for `GET /action`; older ones are
    /// dropped first.
    pub max_listed_actions: usize,
}

impl Default for HttpBotConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_listed_actions: 100,
        }
    }
}

impl HttpBotConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_with_extra_keys() {
        let config: HttpBotConfig =
            serde_yaml::from_str("adapter: http\nport: 9090\n").unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9090);
        assert_eq!(config.max_listed_actions, 100);
    }
}
