//! Configuration loading from disk.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::config::schema::ServerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ServerConfig, ConfigError> {
    let config: ServerConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    let mut seen = HashSet::new();
    for source in &config.sources {
        if !seen.insert(source.name.as_str()) {
            tracing::warn!(source = %source.name, "Duplicate source name; losses will be hard to tell apart");
        }
    }

    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [timeouts]
            request_ms = 400

            [race]
            per_task_ms = 150
            outer_ms = 300

            [[sources]]
            name = "mirror-a"
            endpoint = "http://127.0.0.1:9001/json/last/USD-BRL"

            [[sources]]
            name = "mirror-b"
            endpoint = "http://127.0.0.1:9002/json/last/USD-BRL"

            [client]
            budget_ms = 500
            "#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.race.per_task_ms, 150);
        assert_eq!(config.timeouts.request_ms, 400);
    }

    #[test]
    fn test_validation_error_display() {
        let err = parse_config("[timeouts]\nrequest_ms = 100\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().starts_with("Validation failed: "));
        assert!(err.to_string().contains("timeouts.request_ms"));
    }

    #[test]
    fn test_parse_error() {
        let err = parse_config("[race\nouter_ms = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/quote-race.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
