//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports are the seams callers program against. Backends in
//! [`crate::adapter`] implement them, so service code consumes a
//! [`Storage`] identically whether records live in a document store or a
//! relational database.
//!
//! # Architecture
//!
//! ```text
//!                 ┌─────────────────────────┐
//!                 │     Service code        │
//!                 │  Filter, SortSpec, Item │
//!                 └────────────┬────────────┘
//!                              │ Storage / StorageWatcher
//!              ┌───────────────┴───────────────┐
//!              ▼                               ▼
//!      ┌───────────────┐               ┌───────────────┐
//!      │ MongoStorage  │               │  SqlStorage   │
//!      │ MongoFilter-  │               │ SqlFilter-    │
//!      │ Parser        │               │ Parser        │
//!      └───────────────┘               └───────────────┘
//! ```

pub mod outbound;

pub use outbound::filter::FilterParser;
pub use outbound::store::{Records, Storage, StorageWatcher};
