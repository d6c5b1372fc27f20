//! Typed models the relational backend can store.

use diesel::sqlite::Sqlite;
use diesel::{QueryResult, QueryableByName, SqliteConnection};

use crate::error::{Error, Result};

/// A row type bound to one table.
///
/// Rows are read back with raw `SELECT *` queries, so the model loads by
/// column name through [`QueryableByName`]. Writes go through [`insert`],
/// which keeps the typed Diesel DSL on the model side.
///
/// [`insert`]: SqlModel::insert
pub trait SqlModel: QueryableByName<Sqlite> + Send + Sync + Sized + 'static {
    /// Table name.
    const TABLE: &'static str;

    /// Primary-key column, targeted by `delete`.
    const PRIMARY_KEY: &'static str;

    /// Columns that filters and sort keys may reference.
    const COLUMNS: &'static [&'static str];

    /// `CREATE TABLE IF NOT EXISTS` statement used when no migrations run.
    const SCHEMA: &'static str;

    /// Insert this row.
    fn insert(&self, conn: &mut SqliteConnection) -> QueryResult<usize>;

    /// Resolve a field name to one of the model's columns.
    ///
    /// # Errors
    /// Returns [`Error::UnknownField`] if the model has no such column.
    fn resolve(field: &str) -> Result<&'static str> {
        Self::COLUMNS
            .iter()
            .copied()
            .find(|column| *column == field)
            .ok_or_else(|| Error::UnknownField {
                model: Self::TABLE,
                field: field.to_string(),
            })
    }
}
