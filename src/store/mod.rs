//! Document store - the collection-oriented backend bindings query.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 DocumentStore (injected)                     │
//! │  collection(name) -> Collection                              │
//! └─────────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Collection                              │
//! │  find(query) -> documents                                    │
//! │  observe(query) -> ChangeFeed (added / changed / removed)    │
//! └─────────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ChangeFeed                              │
//! │  poll() -> next ChangeEvent (FIFO) / stop()                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`InMemoryDocumentStore`] is the included implementation, for tests and
//! single-process use.

mod in_memory;
pub(crate) mod matcher;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::StoreError;
use crate::path::DocumentId;
use crate::query::QuerySpec;

pub use in_memory::{InMemoryChangeFeed, InMemoryDocumentStore};

/// A change to the result set of a live query.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// A document entered the result set. `before` names the document it
    /// now precedes; `None` means it goes last.
    Added {
        id: DocumentId,
        fields: Value,
        before: Option<DocumentId>,
    },
    /// A document in the result set changed.
    Changed { id: DocumentId, fields: Value },
    /// A document left the result set.
    Removed { id: DocumentId },
}

impl ChangeEvent {
    pub fn id(&self) -> &DocumentId {
        match self {
            ChangeEvent::Added { id, .. }
            | ChangeEvent::Changed { id, .. }
            | ChangeEvent::Removed { id } => id,
        }
    }

    pub fn added(id: impl Into<DocumentId>) -> Self {
        ChangeEvent::Added {
            id: id.into(),
            fields: Value::Null,
            before: None,
        }
    }

    pub fn added_before(id: impl Into<DocumentId>, before: impl Into<DocumentId>) -> Self {
        ChangeEvent::Added {
            id: id.into(),
            fields: Value::Null,
            before: Some(before.into()),
        }
    }

    pub fn changed(id: impl Into<DocumentId>) -> Self {
        ChangeEvent::Changed {
            id: id.into(),
            fields: Value::Null,
        }
    }

    pub fn removed(id: impl Into<DocumentId>) -> Self {
        ChangeEvent::Removed { id: id.into() }
    }
}

/// Resolves collection names to query-capable handles.
pub trait DocumentStore: Send + Sync {
    fn collection(&self, name: &str) -> Option<Arc<dyn Collection>>;
}

/// One named collection of documents.
pub trait Collection: Send + Sync {
    fn name(&self) -> &str;

    /// Run `query` once and return the matching documents.
    fn find(&self, query: &QuerySpec) -> Result<Vec<Value>, StoreError>;

    /// Start a live query. The feed first yields an `Added` event for every
    /// current match, then one event per change to the result set.
    fn observe(&self, query: &QuerySpec) -> Result<Box<dyn ChangeFeed>, StoreError>;
}

/// Pull-based stream of [`ChangeEvent`]s for one live query.
pub trait ChangeFeed: Send {
    /// Next pending event, in delivery order.
    fn poll(&mut self) -> Option<ChangeEvent>;

    /// Stop the live query. Pending events are discarded and nothing is
    /// delivered afterwards. Stopping twice is a no-op.
    fn stop(&mut self);

    fn is_stopped(&self) -> bool;
}

/// A query bound to a collection, ready to be fetched or observed.
#[derive(Clone)]
pub struct Cursor {
    collection: Arc<dyn Collection>,
    query: QuerySpec,
}

impl Cursor {
    pub fn new(collection: Arc<dyn Collection>, query: QuerySpec) -> Self {
        Self { collection, query }
    }

    pub fn query(&self) -> &QuerySpec {
        &self.query
    }

    pub fn collection_name(&self) -> &str {
        self.collection.name()
    }

    pub fn fetch(&self) -> Result<Vec<Value>, StoreError> {
        self.collection.find(&self.query)
    }

    pub fn first(&self) -> Result<Option<Value>, StoreError> {
        Ok(self.fetch()?.into_iter().next())
    }

    pub fn observe_changes(&self) -> Result<Box<dyn ChangeFeed>, StoreError> {
        self.collection.observe(&self.query)
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("collection", &self.collection.name())
            .field("query", &self.query)
            .finish()
    }
}
