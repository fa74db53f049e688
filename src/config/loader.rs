//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum LoadError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Io(e) => write!(f, "IO error: {}", e),
            LoadError::Parse(e) => write!(f, "Parse error: {}", e),
            LoadError::Validation(errors) => {
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

impl std::error::Error for LoadError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServiceConfig, LoadError> {
    let content = fs::read_to_string(path).map_err(LoadError::Io)?;
    parse_config(&content)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<ServiceConfig, LoadError> {
    let config: ServiceConfig = toml::from_str(content).map_err(LoadError::Parse)?;
    validate_config(&config).map_err(LoadError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[environment]\nname = \"prod\"\n[notifications]\ninterval_ms = 250").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.environment.name, "prod");
        assert_eq!(config.notifications.interval_ms, 250);
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/dynamic-config.toml")).unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }

    #[test]
    fn test_validation_failure_is_reported() {
        let err = parse_config("[listener]\nbind_address = \"nope\"").unwrap_err();
        assert!(err.to_string().contains("listener.bind_address"));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(parse_config("[listener"), Err(LoadError::Parse(_))));
    }
}
