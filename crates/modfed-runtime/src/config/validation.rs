//! Configuration validation.

use figment::value::Value;

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogOutput, ModfedConfig, section_adapter, section_features};

/// Validates the entire configuration.
pub fn validate_config(config: &ModfedConfig) -> ConfigResult<()> {
    validate_logging(config)?;
    validate_router(config)?;

    for (identity, section) in &config.bots {
        validate_section("bots", identity, section)?;
    }
    for (name, section) in &config.transports {
        validate_section("transports", name, section)?;
        section_features(section).map_err(|e| {
            ConfigError::validation(format!("transports.{name}.features: {e}"))
        })?;
    }

    Ok(())
}

fn validate_logging(config: &ModfedConfig) -> ConfigResult<()> {
    if config.logging.output == LogOutput::File && config.logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    Ok(())
}

fn validate_router(config: &ModfedConfig) -> ConfigResult<()> {
    if config.router.dedup_capacity == Some(0) {
        return Err(ConfigError::validation(
            "router.dedup_capacity must be greater than 0 when set",
        ));
    }
    Ok(())
}

/// Validates a single bot or transport section.
fn validate_section(kind: &str, key: &str, section: &Value) -> ConfigResult<()> {
    if key.trim().is_empty() {
        return Err(ConfigError::validation(format!("{kind} key cannot be empty")));
    }
    if key.chars().any(char::is_whitespace) {
        return Err(ConfigError::validation(format!(
            "{kind} key '{key}' cannot contain whitespace"
        )));
    }
    if section.as_dict().is_none() {
        return Err(ConfigError::validation(format!(
            "{kind}.{key} must be a table"
        )));
    }
    if section_adapter(section).is_none() {
        return Err(ConfigError::missing_field(format!("{kind}.{key}.adapter")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> ModfedConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_validate_empty_config() {
        assert!(validate_config(&ModfedConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_sections() {
        let config = parse("bots:\n  panel:\n    adapter: http\n");
        assert!(validate_config(&config).is_ok());

        let config = parse("bots:\n  panel:\n    port: 8080\n");
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));

        let config = parse("bots:\n  \"my bot\":\n    adapter: http\n");
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));

        let config = parse("transports:\n  bus: local\n");
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_features() {
        let config = parse("transports:\n  bus:\n    adapter: local\n    features: [send, gossip]\n");
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_validate_router_and_logging() {
        let config = parse("router:\n  dedup_capacity: 0\n");
        assert!(validate_config(&config).is_err());

        let config = parse("logging:\n  output: file\n");
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));
    }
}
