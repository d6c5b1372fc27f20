//! In-process document database.
//!
//! Supports the query subset produced by
//! [`MongoFilterParser`](super::parser::MongoFilterParser): equality,
//! `$gt`/`$lt`/`$gte`/`$lte`/`$eq`/`$ne`, dotted field paths and sorting.
//! Insert watches are delivered through channels.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;

use mongodb::bson::{Bson, Document};
use parking_lot::Mutex;
use tracing::debug;

use super::collection::{DocumentCollection, DocumentCursor, DocumentDatabase, InsertFeed, WATCH_POLL};
use crate::error::{Error, Result};

/// Database whose collections live in memory.
pub struct InMemoryDatabase {
    name: String,
    collections: Mutex<HashMap<String, Arc<InMemoryCollection>>>,
}

impl InMemoryDatabase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collections: Mutex::new(HashMap::new()),
        }
    }
}

impl DocumentDatabase for InMemoryDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    fn collection(&self, name: &str) -> Arc<dyn DocumentCollection> {
        let mut collections = self.collections.lock();
        let collection = collections
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(InMemoryCollection::new(name)));
        Arc::clone(collection) as Arc<dyn DocumentCollection>
    }

    fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Collection stored as a vector in insertion order.
pub struct InMemoryCollection {
    name: String,
    documents: Mutex<Vec<Document>>,
    subscribers: Mutex<Vec<Sender<Document>>>,
}

impl InMemoryCollection {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            documents: Mutex::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    fn matching(&self, query: &Document) -> Vec<Document> {
        self.documents
            .lock()
            .iter()
            .filter(|doc| matches_query(doc, query))
            .cloned()
            .collect()
    }

    fn publish(&self, document: &Document) {
        self.subscribers
            .lock()
            .retain(|subscriber| subscriber.send(document.clone()).is_ok());
    }
}

impl DocumentCollection for InMemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn insert_one(&self, document: &Document) -> Result<()> {
        {
            let mut documents = self.documents.lock();
            if let Some(id) = document.get("_id") {
                if documents.iter().any(|doc| doc.get("_id") == Some(id)) {
                    return Err(Error::StorageIntegrity(format!(
                        "E11000 duplicate key error collection: {} index: _id_ dup key: {{ _id: {id} }}",
                        self.name
                    )));
                }
            }
            documents.push(document.clone());
        }
        self.publish(document);
        Ok(())
    }

    fn find(&self, query: Document, sort: Option<Document>) -> Result<DocumentCursor> {
        let mut documents = self.matching(&query);
        if let Some(sort) = sort {
            documents.sort_by(|a, b| compare_by(a, b, &sort));
        }
        Ok(Box::new(documents.into_iter().map(Ok)))
    }

    fn find_one(&self, query: Document) -> Result<Option<Document>> {
        Ok(self
            .documents
            .lock()
            .iter()
            .find(|doc| matches_query(doc, &query))
            .cloned())
    }

    fn delete_one(&self, id: Bson) -> Result<u64> {
        let mut documents = self.documents.lock();
        match documents.iter().position(|doc| doc.get("_id") == Some(&id)) {
            Some(index) => {
                documents.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn watch_inserts(&self) -> Result<Box<dyn InsertFeed>> {
        let (sender, receiver) = mpsc::channel();
        self.subscribers.lock().push(sender);
        debug!(collection = %self.name, "insert watch opened");
        Ok(Box::new(ChannelFeed { receiver }))
    }
}

struct ChannelFeed {
    receiver: Receiver<Document>,
}

impl InsertFeed for ChannelFeed {
    fn poll(&mut self) -> Result<Option<Document>> {
        match self.receiver.recv_timeout(WATCH_POLL) {
            Ok(document) => Ok(Some(document)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(Error::Storage("change stream closed".to_string()))
            }
        }
    }
}

fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let mut current = document.get(parts.next()?)?;
    for part in parts {
        current = current.as_document()?.get(part)?;
    }
    Some(current)
}

fn is_operator_document(condition: &Document) -> bool {
    !condition.is_empty() && condition.keys().all(|key| key.starts_with('$'))
}

fn matches_query(document: &Document, query: &Document) -> bool {
    query.iter().all(|(path, condition)| {
        let actual = lookup(document, path);
        match condition {
            Bson::Document(ops) if is_operator_document(ops) => ops
                .iter()
                .all(|(op, operand)| matches_operator(actual, op, operand)),
            expected => equals(actual, expected),
        }
    })
}

fn matches_operator(actual: Option<&Bson>, op: &str, operand: &Bson) -> bool {
    match op {
        "$eq" => equals(actual, operand),
        "$ne" => !equals(actual, operand),
        "$gt" => compare(actual, operand) == Some(Ordering::Greater),
        "$lt" => compare(actual, operand) == Some(Ordering::Less),
        "$gte" => matches!(compare(actual, operand), Some(Ordering::Greater | Ordering::Equal)),
        "$lte" => matches!(compare(actual, operand), Some(Ordering::Less | Ordering::Equal)),
        _ => false,
    }
}

/// Missing fields equal `null`; numbers compare across widths.
fn equals(actual: Option<&Bson>, expected: &Bson) -> bool {
    match actual {
        None => matches!(expected, Bson::Null),
        Some(actual) => compare(Some(actual), expected) == Some(Ordering::Equal) || actual == expected,
    }
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(i) => Some(f64::from(*i)),
        #[allow(clippy::cast_precision_loss)]
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(f) => Some(*f),
        _ => None,
    }
}

/// Ordering between comparable values of the same kind.
fn compare(actual: Option<&Bson>, operand: &Bson) -> Option<Ordering> {
    let actual = actual?;
    if let (Some(a), Some(b)) = (as_number(actual), as_number(operand)) {
        return a.partial_cmp(&b);
    }
    match (actual, operand) {
        (Bson::String(a), Bson::String(b)) => Some(a.cmp(b)),
        (Bson::DateTime(a), Bson::DateTime(b)) => Some(a.cmp(b)),
        (Bson::Boolean(a), Bson::Boolean(b)) => Some(a.cmp(b)),
        (Bson::ObjectId(a), Bson::ObjectId(b)) => Some(a.bytes().cmp(&b.bytes())),
        _ => None,
    }
}

fn compare_by(a: &Document, b: &Document, sort: &Document) -> Ordering {
    for (path, order) in sort {
        let ordering = match (lookup(a, path), lookup(b, path)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => compare(Some(x), y).unwrap_or(Ordering::Equal),
        };
        let descending = as_number(order).is_some_and(|o| o < 0.0);
        let ordering = if descending { ordering.reverse() } else { ordering };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
