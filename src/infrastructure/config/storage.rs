//! Storage backend configuration.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{ConfigError, Result};
use crate::infrastructure::factory::storage::StorageType;

/// Which backend to build, plus the settings of each backend.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Backend tag, `MONGO` or `SQL`. Unknown tags are reported when the
    /// backend is created.
    pub kind: String,
    #[serde(default)]
    pub mongo: Option<MongoConfig>,
    #[serde(default)]
    pub sql: Option<SqlConfig>,
}

impl StorageConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        match self.kind.parse::<StorageType>() {
            Ok(StorageType::Mongo) => self
                .mongo
                .as_ref()
                .ok_or(ConfigError::MissingField {
                    field: "storage.mongo",
                })?
                .validate(),
            Ok(StorageType::Sql) => self
                .sql
                .as_ref()
                .ok_or(ConfigError::MissingField { field: "storage.sql" })?
                .validate(),
            Err(_) => Ok(()),
        }
    }
}

/// Document backend: a replica set and the database to use.
#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    /// Comma-separated `host:port` list.
    pub members: String,
    pub replica_set_name: String,
    pub database_name: String,
    /// Collection selected right after connecting.
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default = "default_server_selection_timeout_ms")]
    pub server_selection_timeout_ms: u64,
}

fn default_server_selection_timeout_ms() -> u64 {
    30_000
}

impl MongoConfig {
    /// Trimmed, non-empty member hosts.
    #[must_use]
    pub fn member_hosts(&self) -> Vec<&str> {
        self.members
            .split(',')
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .collect()
    }

    /// Replica-set connection string.
    #[must_use]
    pub fn connection_uri(&self) -> String {
        format!(
            "mongodb://{}/?replicaSet={}&serverSelectionTimeoutMS={}",
            self.member_hosts().join(","),
            self.replica_set_name,
            self.server_selection_timeout_ms
        )
    }

    /// Direct connection to one member, bypassing replica-set discovery.
    #[must_use]
    pub fn direct_uri(&self, host: &str) -> String {
        format!(
            "mongodb://{host}/?directConnection=true&serverSelectionTimeoutMS={}",
            self.server_selection_timeout_ms
        )
    }

    fn validate(&self) -> Result<()> {
        let hosts = self.member_hosts();
        if hosts.is_empty() {
            return Err(ConfigError::MissingField { field: "members" }.into());
        }
        for host in hosts {
            let valid = host
                .rsplit_once(':')
                .is_some_and(|(name, port)| !name.is_empty() && port.parse::<u16>().is_ok());
            if !valid {
                return Err(ConfigError::InvalidValue {
                    field: "members",
                    reason: format!("expected host:port, got {host}"),
                }
                .into());
            }
        }
        if self.replica_set_name.is_empty() {
            return Err(ConfigError::MissingField {
                field: "replica_set_name",
            }
            .into());
        }
        if self.database_name.is_empty() {
            return Err(ConfigError::MissingField {
                field: "database_name",
            }
            .into());
        }
        Ok(())
    }
}

/// Relational backend.
#[derive(Debug, Clone, Deserialize)]
pub struct SqlConfig {
    /// SQLite path or `:memory:`.
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// File-based migrations applied at startup instead of the model schema.
    #[serde(default)]
    pub migrations_dir: Option<PathBuf>,
}

fn default_max_connections() -> u32 {
    5
}

impl SqlConfig {
    fn validate(&self) -> Result<()> {
        if self.database_url.is_empty() {
            return Err(ConfigError::MissingField {
                field: "database_url",
            }
            .into());
        }
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_connections",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        Ok(())
    }
}
