//! Relational backend over SQLite and Diesel.
//!
//! Provides the connection pool, schema initialisation, the re-entrant
//! session provider, the relational filter parser and [`SqlStorage`].

pub mod database;
pub mod parser;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use database::connection::{create_pool, init_sql_db, sql_health_check, DbPool};
pub use database::model::SqlModel;
pub use parser::SqlFilterParser;
pub use session::{Session, SessionProvider, SessionScope};
pub use store::SqlStorage;
