//! Document backend over MongoDB.
//!
//! Provides the document filter parser, the collection seam with a driver
//! and an in-memory implementation, [`MongoStorage`] and the insert watch.

pub mod collection;
pub mod memory;
pub mod parser;
pub mod store;
pub mod watch;

pub use collection::{DocumentCollection, DocumentDatabase, MongoDatabase};
pub use memory::InMemoryDatabase;
pub use parser::MongoFilterParser;
pub use store::MongoStorage;
pub use watch::{InsertStream, InterruptHandle};
