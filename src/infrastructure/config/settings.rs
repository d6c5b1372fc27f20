//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct. Configuration is loaded from a TOML
//! file; `POLYSTORE_STORAGE_KIND` overrides the configured backend.
//!
//! # Example
//!
//! ```no_run
//! use polystore::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;

use serde::Deserialize;

use super::logging::LoggingConfig;
use super::storage::StorageConfig;
use crate::error::{ConfigError, Result};

/// Environment variable replacing `storage.kind`.
pub const STORAGE_KIND_ENV: &str = "POLYSTORE_STORAGE_KIND";

/// Main application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Backend selection and connection settings.
    pub storage: StorageConfig,
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is malformed or validation fails.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.override_kind(std::env::var(STORAGE_KIND_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the content is malformed,
    /// or validation fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    fn override_kind(&mut self, kind: Option<String>) {
        if let Some(kind) = kind.filter(|k| !k.trim().is_empty()) {
            self.storage.kind = kind.trim().to_string();
        }
    }

    fn validate(&self) -> Result<()> {
        if self.storage.kind.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "storage.kind",
            }
            .into());
        }
        self.storage.validate()
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::infrastructure::config::logging::LogFormat;

    const FULL: &str = r#"
        [logging]
        level = "debug"
        format = "json"

        [storage]
        kind = "MONGO"

        [storage.mongo]
        members = "mongo1:27017,mongo2:27017"
        replica_set_name = "rs0"
        database_name = "news"
        collection = "news"

        [storage.sql]
        database_url = ":memory:"
        max_connections = 2
        migrations_dir = "migrations"
    "#;

    fn parse(content: &str) -> Result<Config> {
        let mut config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.override_kind(None);
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn parses_full_config() {
        let config = parse(FULL).unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.storage.kind, "MONGO");

        let mongo = config.storage.mongo.unwrap();
        assert_eq!(mongo.member_hosts().len(), 2);
        assert_eq!(mongo.collection.as_deref(), Some("news"));

        let sql = config.storage.sql.unwrap();
        assert_eq!(sql.max_connections, 2);
        assert_eq!(sql.migrations_dir.unwrap(), Path::new("migrations"));
    }

    #[test]
    fn logging_section_is_optional() {
        let config = parse("[storage]\nkind = \"SQL\"\n[storage.sql]\ndatabase_url = \"a.db\"").unwrap();
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn kind_override_replaces_configured_kind() {
        let mut config: Config = toml::from_str(FULL).unwrap();
        config.override_kind(Some(" SQL ".to_string()));
        assert_eq!(config.storage.kind, "SQL");

        config.override_kind(Some(String::new()));
        assert_eq!(config.storage.kind, "SQL");
    }

    #[test]
    fn missing_backend_section_fails_validation() {
        let result = parse("[storage]\nkind = \"MONGO\"");
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::MissingField { field: "storage.mongo" }))
        ));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let result = Config::parse_toml("[storage\nkind = ");
        assert!(matches!(result, Err(Error::Config(ConfigError::Parse(_)))));
    }

    #[test]
    fn missing_file_is_read_error() {
        let result = Config::load("/nonexistent/polystore.toml");
        assert!(matches!(result, Err(Error::Config(ConfigError::ReadFile(_)))));
    }
}
