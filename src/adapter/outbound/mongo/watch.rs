//! Blocking stream of inserted documents.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mongodb::bson::Document;
use tracing::{error, info};

use super::collection::InsertFeed;
use crate::error::{Error, Result};

/// Cloneable flag that stops an [`InsertStream`] from another thread.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle(Arc<AtomicBool>);

impl InterruptHandle {
    pub fn interrupt(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Documents inserted into a collection, in arrival order.
///
/// Blocks while waiting for the next insert. On a feed error, or once
/// interrupted, the watch is closed, the error is yielded, and the stream
/// ends.
pub struct InsertStream {
    collection: String,
    feed: Option<Box<dyn InsertFeed>>,
    interrupt: InterruptHandle,
}

impl InsertStream {
    pub(crate) fn new(collection: impl Into<String>, feed: Box<dyn InsertFeed>) -> Self {
        Self {
            collection: collection.into(),
            feed: Some(feed),
            interrupt: InterruptHandle::default(),
        }
    }

    #[must_use]
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.feed.is_none()
    }

    fn close(&mut self) {
        if self.feed.take().is_some() {
            info!(collection = %self.collection, "insert watch closed");
        }
    }
}

impl Iterator for InsertStream {
    type Item = Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.interrupt.is_interrupted() {
                return self.feed.is_some().then(|| {
                    self.close();
                    Err(Error::Interrupted)
                });
            }

            match self.feed.as_mut()?.poll() {
                Ok(Some(document)) => return Some(Ok(document)),
                Ok(None) => {}
                Err(err) => {
                    error!(collection = %self.collection, error = %err, "insert watch failed");
                    self.close();
                    return Some(Err(err));
                }
            }
        }
    }
}
