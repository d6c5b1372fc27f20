//! Collection seam between [`MongoStorage`](super::store::MongoStorage) and
//! the document store.
//!
//! [`MongoDatabase`] talks to a MongoDB deployment through the official
//! driver. [`InMemoryDatabase`](super::memory::InMemoryDatabase) implements
//! the same traits for tests and local runs.

use std::sync::Arc;
use std::time::Duration;

use mongodb::bson::{doc, Bson, Document};
use mongodb::change_stream::event::ChangeStreamEvent;
use mongodb::options::{ChangeStreamOptions, FindOptions};
use mongodb::sync::{ChangeStream, Collection, Database};

use crate::error::Result;

/// Lazy sequence of documents returned by [`DocumentCollection::find`].
pub type DocumentCursor = Box<dyn Iterator<Item = Result<Document>> + Send>;

/// How long a single feed poll waits for an insert.
pub const WATCH_POLL: Duration = Duration::from_millis(500);

/// Source of inserted documents behind an insert watch.
pub trait InsertFeed: Send {
    /// Wait up to [`WATCH_POLL`] for the next insert; `Ok(None)` if none arrived.
    fn poll(&mut self) -> Result<Option<Document>>;
}

/// One named collection.
pub trait DocumentCollection: Send + Sync {
    fn name(&self) -> &str;

    fn insert_one(&self, document: &Document) -> Result<()>;

    /// Documents matching `query`, ordered by `sort` when given.
    fn find(&self, query: Document, sort: Option<Document>) -> Result<DocumentCursor>;

    fn find_one(&self, query: Document) -> Result<Option<Document>>;

    /// Delete the document whose `_id` equals `id`; returns the number removed.
    fn delete_one(&self, id: Bson) -> Result<u64>;

    /// Open a feed of documents inserted from now on.
    fn watch_inserts(&self) -> Result<Box<dyn InsertFeed>>;
}

/// A database holding named collections.
pub trait DocumentDatabase: Send + Sync {
    fn name(&self) -> &str;

    fn collection(&self, name: &str) -> Arc<dyn DocumentCollection>;

    /// Round-trip to the server.
    fn ping(&self) -> Result<()>;
}

/// Database handle backed by the MongoDB driver.
pub struct MongoDatabase {
    database: Database,
}

impl MongoDatabase {
    #[must_use]
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

impl DocumentDatabase for MongoDatabase {
    fn name(&self) -> &str {
        self.database.name()
    }

    fn collection(&self, name: &str) -> Arc<dyn DocumentCollection> {
        Arc::new(MongoCollection {
            collection: self.database.collection::<Document>(name),
        })
    }

    fn ping(&self) -> Result<()> {
        self.database.run_command(doc! { "ping": 1 }, None)?;
        Ok(())
    }
}

struct MongoCollection {
    collection: Collection<Document>,
}

impl DocumentCollection for MongoCollection {
    fn name(&self) -> &str {
        self.collection.name()
    }

    fn insert_one(&self, document: &Document) -> Result<()> {
        self.collection.insert_one(document, None)?;
        Ok(())
    }

    fn find(&self, query: Document, sort: Option<Document>) -> Result<DocumentCursor> {
        let options = FindOptions::builder().sort(sort).build();
        let cursor = self.collection.find(query, options)?;
        Ok(Box::new(cursor.map(|doc| doc.map_err(Into::into))))
    }

    fn find_one(&self, query: Document) -> Result<Option<Document>> {
        Ok(self.collection.find_one(query, None)?)
    }

    fn delete_one(&self, id: Bson) -> Result<u64> {
        let result = self.collection.delete_one(doc! { "_id": id }, None)?;
        Ok(result.deleted_count)
    }

    fn watch_inserts(&self) -> Result<Box<dyn InsertFeed>> {
        let pipeline = [doc! { "$match": { "operationType": "insert" } }];
        let options = ChangeStreamOptions::builder()
            .max_await_time(Some(WATCH_POLL))
            .build();
        let stream = self.collection.watch(pipeline, options)?;
        Ok(Box::new(MongoInsertFeed { stream }))
    }
}

struct MongoInsertFeed {
    stream: ChangeStream<ChangeStreamEvent<Document>>,
}

impl InsertFeed for MongoInsertFeed {
    fn poll(&mut self) -> Result<Option<Document>> {
        Ok(self
            .stream
            .next_if_any()?
            .and_then(|event| event.full_document))
    }
}
