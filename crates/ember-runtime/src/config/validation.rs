//! Configuration validation utilities.

use figment::value::Value;

use super::error::{ConfigError, ConfigResult};
use super::schema::{EmberConfig, LogFormat, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &EmberConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_adapter_sections(config)?;
    Ok(())
}

/// Validates logging settings.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    if logging.format == LogFormat::Json && !cfg!(feature = "json-log") {
        return Err(ConfigError::validation(
            "logging.format = \"json\" requires the json-log feature",
        ));
    }

    if let Some(module) = logging.filters.keys().find(|m| m.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "Invalid logging filter module name: {module:?}"
        )));
    }

    Ok(())
}

/// Each adapter section must be a table.
fn validate_adapter_sections(config: &EmberConfig) -> ConfigResult<()> {
    for (name, section) in &config.adapters {
        if !matches!(section, Value::Dict(..)) {
            return Err(ConfigError::validation(format!(
                "adapters.{name} must be a table"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&EmberConfig::default()).is_ok());
    }

    #[test]
    fn test_file_output_needs_path() {
        let mut config = EmberConfig::default();
        config.logging.output = LogOutput::File;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));

        config.logging.file_path = Some(PathBuf::from("logs/ember.log"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_adapter_section_must_be_table() {
        let mut config = EmberConfig::default();
        config
            .adapters
            .insert("campfire".to_string(), Value::from("oops"));
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }
}
