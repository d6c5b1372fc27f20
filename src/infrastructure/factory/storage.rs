//! Storage factory: the one place backend variants are registered.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::info;

use crate::adapter::outbound::mongo::MongoStorage;
use crate::adapter::outbound::sqlite::{
    create_pool, init_sql_db, sql_health_check, SessionProvider, SqlModel, SqlStorage,
};
use crate::error::{ConfigError, Error, Result};
use crate::infrastructure::config::storage::{MongoConfig, SqlConfig, StorageConfig};

/// Backend tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageType {
    Mongo,
    Sql,
}

impl StorageType {
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            StorageType::Mongo => "MONGO",
            StorageType::Sql => "SQL",
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for StorageType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MONGO" => Ok(StorageType::Mongo),
            "SQL" => Ok(StorageType::Sql),
            _ => Err(Error::UnsupportedStorageType(s.to_string())),
        }
    }
}

/// A constructed backend. The variants store different record types, so
/// callers match on the variant they configured.
pub enum AnyStorage<M> {
    Mongo(MongoStorage),
    Sql(SqlStorage<M>),
}

impl<M: SqlModel> AnyStorage<M> {
    #[must_use]
    pub fn kind(&self) -> StorageType {
        match self {
            AnyStorage::Mongo(_) => StorageType::Mongo,
            AnyStorage::Sql(_) => StorageType::Sql,
        }
    }

    #[must_use]
    pub fn health_check(&self) -> bool {
        match self {
            AnyStorage::Mongo(storage) => storage.health_check(),
            AnyStorage::Sql(storage) => storage.health_check(),
        }
    }

    #[must_use]
    pub fn as_mongo(&self) -> Option<&MongoStorage> {
        match self {
            AnyStorage::Mongo(storage) => Some(storage),
            AnyStorage::Sql(_) => None,
        }
    }

    #[must_use]
    pub fn as_sql(&self) -> Option<&SqlStorage<M>> {
        match self {
            AnyStorage::Sql(storage) => Some(storage),
            AnyStorage::Mongo(_) => None,
        }
    }
}

fn mongo_section(config: &StorageConfig) -> Result<&MongoConfig> {
    Ok(config.mongo.as_ref().ok_or(ConfigError::MissingField {
        field: "storage.mongo",
    })?)
}

fn sql_section(config: &StorageConfig) -> Result<&SqlConfig> {
    Ok(config
        .sql
        .as_ref()
        .ok_or(ConfigError::MissingField { field: "storage.sql" })?)
}

/// Builds backends from configuration.
pub struct StorageFactory;

impl StorageFactory {
    /// Build the backend named by `kind`.
    ///
    /// The tag is checked before anything is constructed. SQL storage is
    /// bound to model `M`, whose schema is prepared on creation.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedStorageType`] for an unknown tag,
    /// [`ConfigError::MissingField`] when the backend section is absent, or
    /// the backend's connection error.
    pub fn create<M: SqlModel>(kind: &str, config: &StorageConfig) -> Result<AnyStorage<M>> {
        match kind.parse::<StorageType>()? {
            StorageType::Mongo => {
                let mongo = mongo_section(config)?;
                Self::mongo(mongo).map(AnyStorage::Mongo)
            }
            StorageType::Sql => {
                let sql = sql_section(config)?;
                Self::sql::<M>(sql).map(AnyStorage::Sql)
            }
        }
    }

    /// Build the backend selected by `config.kind`.
    ///
    /// # Errors
    /// See [`StorageFactory::create`].
    pub fn from_config<M: SqlModel>(config: &StorageConfig) -> Result<AnyStorage<M>> {
        Self::create(&config.kind, config)
    }

    /// Connect to the backend selected by `config.kind` and run its health
    /// check, without binding a model.
    ///
    /// # Errors
    /// Same as [`StorageFactory::create`].
    pub fn probe(config: &StorageConfig) -> Result<bool> {
        match config.kind.parse::<StorageType>()? {
            StorageType::Mongo => {
                let mongo = mongo_section(config)?;
                Ok(Self::mongo(mongo)?.health_check())
            }
            StorageType::Sql => {
                let sql = sql_section(config)?;
                let pool = create_pool(&sql.database_url, sql.max_connections)?;
                Ok(sql_health_check(&pool))
            }
        }
    }

    /// Document backend.
    ///
    /// # Errors
    /// Returns an error if the driver rejects the connection settings.
    pub fn mongo(config: &MongoConfig) -> Result<MongoStorage> {
        MongoStorage::connect(config)
    }

    /// Relational backend for model `M`.
    ///
    /// # Errors
    /// Returns an error if the pool cannot be created or the schema cannot
    /// be prepared.
    pub fn sql<M: SqlModel>(config: &SqlConfig) -> Result<SqlStorage<M>> {
        let pool = create_pool(&config.database_url, config.max_connections)?;
        init_sql_db::<M>(&pool, config.migrations_dir.as_deref())?;
        info!(table = M::TABLE, "sql storage ready");
        Ok(SqlStorage::new(Arc::new(SessionProvider::new(pool))))
    }
}
