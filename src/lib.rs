//! Polystore - backend-agnostic storage for document and relational stores.
//!
//! Service code builds [`Filter`](domain::Filter) values and calls a
//! [`Storage`](port::Storage) without knowing which backend runs them.
//! Each backend compiles filters with its own parser: the document backend
//! into a query document, the relational backend into SQL predicates over a
//! typed model.
//!
//! # Modules
//!
//! - [`domain`] - Filters, sort specifications and filter values
//! - [`port`] - `Storage`, `StorageWatcher` and `FilterParser` traits
//! - [`adapter`] - MongoDB and SQLite backends, plus the operator CLI
//! - [`infrastructure`] - Configuration and the storage factory
//! - [`error`] - Error types for the crate
//!
//! # Example
//!
//! ```
//! use polystore::adapter::outbound::mongo::MongoStorage;
//! use polystore::domain::Filter;
//! use polystore::port::Storage;
//! use mongodb::bson::doc;
//!
//! let storage = MongoStorage::in_memory("news");
//! storage.set_collection("articles");
//! storage.save(doc! { "source": "bbc", "score": 7 }).unwrap();
//!
//! let hit = storage.get_one(&[Filter::matching("source", "bbc")]).unwrap();
//! assert!(hit.is_some());
//! ```

pub mod adapter;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;
