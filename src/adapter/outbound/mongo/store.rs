//! Document [`Storage`] over a MongoDB replica set.

use std::sync::Arc;

use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Bson, Document};
use mongodb::sync::Client;
use parking_lot::RwLock;
use tracing::{debug, error, info};

use super::collection::{DocumentCollection, DocumentDatabase, MongoDatabase};
use super::memory::InMemoryDatabase;
use super::parser::merge_filters;
use super::watch::InsertStream;
use crate::domain::filter::Filter;
use crate::domain::sort::SortSpec;
use crate::error::{Error, Result};
use crate::infrastructure::config::storage::MongoConfig;
use crate::port::outbound::store::{Records, Storage, StorageWatcher};

/// Document storage over one database. Data operations act on the
/// collection chosen with [`set_collection`](Self::set_collection).
pub struct MongoStorage {
    database: Arc<dyn DocumentDatabase>,
    collection: RwLock<Option<Arc<dyn DocumentCollection>>>,
}

impl MongoStorage {
    /// Connect to the replica set described by `config`.
    ///
    /// The replica set is initiated first; a deployment that is already
    /// initiated rejects the command, which is ignored.
    ///
    /// # Errors
    /// Returns an error if the connection string is rejected by the driver.
    pub fn connect(config: &MongoConfig) -> Result<Self> {
        initiate_replica_set(config);

        let client = Client::with_uri_str(config.connection_uri())?;
        info!(
            members = %config.members,
            replica_set = %config.replica_set_name,
            database = %config.database_name,
            "connected to mongo"
        );

        let storage = Self::with_database(Arc::new(MongoDatabase::new(
            client.database(&config.database_name),
        )));
        if let Some(collection) = &config.collection {
            storage.set_collection(collection);
        }
        Ok(storage)
    }

    #[must_use]
    pub fn with_database(database: Arc<dyn DocumentDatabase>) -> Self {
        Self {
            database,
            collection: RwLock::new(None),
        }
    }

    /// Storage over a fresh in-memory database.
    pub fn in_memory(database_name: impl Into<String>) -> Self {
        Self::with_database(Arc::new(InMemoryDatabase::new(database_name)))
    }

    /// Select the collection later operations act on.
    pub fn set_collection(&self, name: &str) {
        *self.collection.write() = Some(self.database.collection(name));
        info!(database = self.database.name(), collection = name, "collection set");
    }

    #[must_use]
    pub fn collection_name(&self) -> Option<String> {
        self.collection.read().as_ref().map(|c| c.name().to_string())
    }

    /// True when the server answers `ping`.
    #[must_use]
    pub fn health_check(&self) -> bool {
        match self.database.ping() {
            Ok(()) => true,
            Err(err) => {
                error!(error = %err, "mongo health check failed");
                false
            }
        }
    }

    fn collection(&self) -> Result<Arc<dyn DocumentCollection>> {
        self.collection
            .read()
            .as_ref()
            .map(Arc::clone)
            .ok_or(Error::CollectionNotSet)
    }
}

fn initiate_replica_set(config: &MongoConfig) {
    let hosts = config.member_hosts();
    let Some(first) = hosts.first() else {
        return;
    };

    let members: Vec<Document> = hosts
        .iter()
        .zip(0_i32..)
        .map(|(host, id)| doc! { "_id": id, "host": *host })
        .collect();
    let command = doc! {
        "replSetInitiate": {
            "_id": config.replica_set_name.as_str(),
            "members": members,
        }
    };

    let result = Client::with_uri_str(config.direct_uri(first))
        .and_then(|client| client.database("admin").run_command(command, None));
    match result {
        Ok(_) => info!(replica_set = %config.replica_set_name, "replica set initialized"),
        Err(err) => info!(error = %err, "replica set already initialized"),
    }
}

impl Storage for MongoStorage {
    type Item = Document;
    type Id = Bson;

    /// Insert `item`, assigning an `_id` when it has none.
    fn save(&self, mut item: Document) -> Result<Document> {
        let collection = self.collection()?;
        if !item.contains_key("_id") {
            item.insert("_id", ObjectId::new());
        }

        match collection.insert_one(&item) {
            Ok(()) => {
                debug!(collection = collection.name(), "document saved");
                Ok(item)
            }
            Err(err) => {
                error!(collection = collection.name(), error = %err, "error saving document");
                Err(err)
            }
        }
    }

    fn get(&self, filters: &[Filter], sort: Option<&SortSpec>) -> Result<Records<'_, Document>> {
        let collection = self.collection()?;
        let query = merge_filters(filters);
        let sort = sort.map(|s| doc! { s.key.as_str(): s.direction.mongo_order() });
        debug!(collection = collection.name(), %query, "find");
        let cursor: Records<'_, Document> = collection.find(query, sort)?;
        Ok(cursor)
    }

    fn get_one(&self, filters: &[Filter]) -> Result<Option<Document>> {
        let collection = self.collection()?;
        collection.find_one(merge_filters(filters))
    }

    fn delete(&self, identifier: Bson) -> Result<()> {
        let collection = self.collection()?;
        match collection.delete_one(identifier) {
            Ok(deleted) => {
                debug!(collection = collection.name(), deleted, "document deleted");
                Ok(())
            }
            Err(err) => {
                error!(collection = collection.name(), error = %err, "error deleting document");
                Err(err)
            }
        }
    }
}

impl StorageWatcher for MongoStorage {
    type Item = Document;
    type Inserts = InsertStream;

    fn consume_inserts(&self) -> Result<InsertStream> {
        let collection = self.collection()?;
        let feed = collection.watch_inserts()?;
        info!(collection = collection.name(), "watching inserts");
        Ok(InsertStream::new(collection.name(), feed))
    }
}
