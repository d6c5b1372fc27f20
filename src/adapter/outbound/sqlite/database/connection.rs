//! Database connection management using Diesel ORM.
//!
//! Provides connection pooling, schema initialisation and a liveness probe
//! for SQLite databases.

use std::path::Path;
use std::time::Duration;

use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::SqliteConnection;
use diesel_migrations::{FileBasedMigrations, MigrationHarness};
use tracing::{debug, info};

use super::model::SqlModel;
use crate::error::{Error, Result};

/// Type alias for a SQLite connection pool.
pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

/// Connection checked out of a [`DbPool`].
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Pragmas applied to every connection handed out by the pool.
#[derive(Debug)]
struct ConnectionOptions;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), diesel::r2d2::Error> {
        diesel::sql_query("PRAGMA busy_timeout = 5000")
            .execute(conn)
            .map_err(diesel::r2d2::Error::QueryError)?;
        diesel::sql_query("PRAGMA foreign_keys = ON")
            .execute(conn)
            .map_err(diesel::r2d2::Error::QueryError)?;
        Ok(())
    }
}

/// True when `database_url` names a private in-memory database.
#[must_use]
pub fn is_memory_url(database_url: &str) -> bool {
    database_url == ":memory:" || database_url.contains("mode=memory")
}

/// Create a connection pool for the given database URL.
///
/// Every connection to `:memory:` opens its own database, so an in-memory
/// pool is pinned to a single connection that is never recycled.
///
/// # Errors
/// Returns an error if the pool cannot be created.
pub fn create_pool(database_url: &str, max_size: u32) -> Result<DbPool> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let builder = Pool::builder()
        .connection_customizer(Box::new(ConnectionOptions))
        .connection_timeout(Duration::from_secs(30));

    let builder = if is_memory_url(database_url) {
        builder.max_size(1).idle_timeout(None).max_lifetime(None)
    } else {
        builder.max_size(max_size.max(1))
    };

    let pool = builder.build(manager)?;
    info!(database_url, max_size = pool.max_size(), "sql pool created");
    Ok(pool)
}

/// Prepare the schema for `M`.
///
/// With a migrations directory, pending file-based migrations are applied;
/// without one, the model's own table definition is executed.
///
/// # Errors
/// Returns an error if a migration or the table definition fails.
pub fn init_sql_db<M: SqlModel>(pool: &DbPool, migrations_dir: Option<&Path>) -> Result<()> {
    let mut conn = pool.get()?;

    match migrations_dir {
        Some(dir) => {
            let migrations =
                FileBasedMigrations::from_path(dir).map_err(|e| Error::Storage(e.to_string()))?;
            let applied = conn
                .run_pending_migrations(migrations)
                .map_err(|e| Error::Storage(e.to_string()))?;
            info!(dir = %dir.display(), applied = applied.len(), "migrations applied");
        }
        None => {
            diesel::sql_query(M::SCHEMA).execute(&mut conn)?;
            debug!(table = M::TABLE, "schema created");
        }
    }

    Ok(())
}

/// Check that the database answers a trivial query.
#[must_use]
pub fn sql_health_check(pool: &DbPool) -> bool {
    let Ok(mut conn) = pool.get() else {
        return false;
    };
    diesel::sql_query("SELECT 1").execute(&mut conn).is_ok()
}
