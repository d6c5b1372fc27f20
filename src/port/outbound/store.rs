//! Persistence ports.

use crate::domain::{filter::Filter, sort::SortSpec};
use crate::error::Result;

/// Lazy sequence of records returned by [`Storage::get`].
pub type Records<'a, T> = Box<dyn Iterator<Item = Result<T>> + 'a>;

/// Storage operations shared by every backend.
///
/// Multiple filters combine by logical AND; an empty slice matches every
/// record.
pub trait Storage: Send + Sync {
    /// Record type: a document for the document backend, a typed row for the
    /// relational backend.
    type Item;

    /// Identifier accepted by [`Storage::delete`].
    type Id;

    /// Persist `item` and return it as stored.
    fn save(&self, item: Self::Item) -> Result<Self::Item>;

    /// Get the records matching `filters`, optionally sorted.
    fn get(&self, filters: &[Filter], sort: Option<&SortSpec>) -> Result<Records<'_, Self::Item>>;

    /// Get the first record matching `filters`.
    fn get_one(&self, filters: &[Filter]) -> Result<Option<Self::Item>>;

    /// Delete the record with the given identifier.
    fn delete(&self, identifier: Self::Id) -> Result<()>;
}

/// Live subscription to insertions.
pub trait StorageWatcher: Send + Sync {
    type Item;

    /// Iterator over inserted records.
    type Inserts: Iterator<Item = Result<Self::Item>> + Send;

    /// Stream of inserted records. Blocks while waiting for the next insert
    /// and only ends on error or interruption.
    fn consume_inserts(&self) -> Result<Self::Inserts>;
}
