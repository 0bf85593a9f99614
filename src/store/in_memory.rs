//! InMemoryDocumentStore - HashMap-backed document store with live queries.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde_json::Value;

use super::matcher::{compare_documents, Selector};
use super::{ChangeEvent, ChangeFeed, Collection, DocumentStore};
use crate::error::StoreError;
use crate::path::DocumentId;
use crate::query::{QueryOptions, QuerySpec};

type Results = Vec<(DocumentId, Value)>;
type Queue = Arc<Mutex<VecDeque<ChangeEvent>>>;

/// A live query registered with the store.
struct LiveQuery {
    collection: String,
    selector: Selector,
    options: QueryOptions,
    results: Results,
    queue: Queue,
    active: Arc<AtomicBool>,
}

#[derive(Default)]
struct StoreState {
    collections: HashMap<String, Vec<Value>>,
    live: Vec<LiveQuery>,
}

/// In-memory document store.
///
/// Collections are vectors of JSON documents keyed by `_id` (a string or
/// `{"$oid": ..}`). Every insert, update and remove re-evaluates the live
/// queries on that collection and queues the difference on their feeds.
/// Clone-friendly via Arc.
///
/// ## Example
///
/// ```
/// use docbind::query::QuerySpec;
/// use docbind::{ChangeFeed, Collection, DocumentStore, InMemoryDocumentStore};
/// use serde_json::json;
///
/// let store = InMemoryDocumentStore::new();
/// store.insert("Orders", json!({"_id": "o1", "total": 10})).unwrap();
///
/// let orders = store.collection("Orders").unwrap();
/// let mut feed = orders.observe(&QuerySpec::all(100)).unwrap();
/// assert!(feed.poll().is_some()); // initial `Added` for o1
/// ```
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    state: Arc<RwLock<StoreState>>,
    stopped: Arc<AtomicUsize>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self, operation: &'static str) -> Result<std::sync::RwLockWriteGuard<'_, StoreState>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::LockPoisoned(operation))
    }

    fn read(&self, operation: &'static str) -> Result<std::sync::RwLockReadGuard<'_, StoreState>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::LockPoisoned(operation))
    }

    /// Register an empty collection so that it can be queried.
    pub fn create_collection(&self, name: &str) -> Result<(), StoreError> {
        self.write("create collection")?
            .collections
            .entry(name.to_string())
            .or_default();
        Ok(())
    }

    /// Insert a document, creating the collection on first use. Replaces an
    /// existing document with the same `_id`.
    pub fn insert(&self, collection: &str, document: Value) -> Result<DocumentId, StoreError> {
        let id = document
            .get("_id")
            .and_then(DocumentId::from_value)
            .ok_or_else(|| StoreError::MissingId {
                collection: collection.to_string(),
            })?;

        let mut state = self.write("insert")?;
        let documents = state.collections.entry(collection.to_string()).or_default();
        match position(documents, &id) {
            Some(index) => documents[index] = document,
            None => documents.push(document),
        }
        notify(&mut state, collection);
        Ok(id)
    }

    /// Merge top-level `fields` into a document. Returns false when the
    /// document does not exist.
    pub fn update(&self, collection: &str, id: &DocumentId, fields: Value) -> Result<bool, StoreError> {
        let mut state = self.write("update")?;
        let Some(documents) = state.collections.get_mut(collection) else {
            return Ok(false);
        };
        let Some(index) = position(documents, id) else {
            return Ok(false);
        };
        if let (Value::Object(target), Value::Object(fields)) = (&mut documents[index], fields) {
            for (key, value) in fields {
                if key != "_id" {
                    target.insert(key, value);
                }
            }
        }
        notify(&mut state, collection);
        Ok(true)
    }

    /// Remove a document. Returns true if it existed.
    pub fn remove(&self, collection: &str, id: &DocumentId) -> Result<bool, StoreError> {
        let mut state = self.write("remove")?;
        let Some(documents) = state.collections.get_mut(collection) else {
            return Ok(false);
        };
        let Some(index) = position(documents, id) else {
            return Ok(false);
        };
        documents.remove(index);
        notify(&mut state, collection);
        Ok(true)
    }

    /// All documents of a collection, in insertion order.
    pub fn documents(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        Ok(self
            .read("documents")?
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    /// Number of live queries that have not been stopped.
    pub fn active_subscriptions(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .live
            .iter()
            .filter(|live| live.active.load(Ordering::SeqCst))
            .count()
    }

    /// Number of explicit `stop()` calls that ended a live query.
    pub fn stopped_subscriptions(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn collection(&self, name: &str) -> Option<Arc<dyn Collection>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        if !state.collections.contains_key(name) {
            return None;
        }
        Some(Arc::new(InMemoryCollection {
            name: name.to_string(),
            store: self.clone(),
        }))
    }
}

struct InMemoryCollection {
    name: String,
    store: InMemoryDocumentStore,
}

impl Collection for InMemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn find(&self, query: &QuerySpec) -> Result<Vec<Value>, StoreError> {
        let state = self.store.read("find")?;
        let documents = state.collections.get(&self.name).map(Vec::as_slice).unwrap_or(&[]);
        let selector = Selector::compile(&query.selector)?;
        Ok(execute(documents, &selector, &query.options)
            .into_iter()
            .map(|(_, document)| document)
            .collect())
    }

    fn observe(&self, query: &QuerySpec) -> Result<Box<dyn ChangeFeed>, StoreError> {
        let mut state = self.store.write("observe")?;
        let documents = state.collections.get(&self.name).map(Vec::as_slice).unwrap_or(&[]);
        let selector = Selector::compile(&query.selector)?;
        let results = execute(documents, &selector, &query.options);

        let initial = results
            .iter()
            .map(|(id, document)| ChangeEvent::Added {
                id: id.clone(),
                fields: document.clone(),
                before: None,
            })
            .collect::<VecDeque<_>>();
        let queue = Arc::new(Mutex::new(initial));
        let active = Arc::new(AtomicBool::new(true));

        state.live.retain(|live| live.active.load(Ordering::SeqCst));
        state.live.push(LiveQuery {
            collection: self.name.clone(),
            selector,
            options: query.options.clone(),
            results,
            queue: Arc::clone(&queue),
            active: Arc::clone(&active),
        });
        tracing::trace!(collection = %self.name, "live query registered");

        Ok(Box::new(InMemoryChangeFeed {
            queue,
            active,
            stopped: Arc::clone(&self.store.stopped),
        }))
    }
}

/// Feed of one in-memory live query.
pub struct InMemoryChangeFeed {
    queue: Queue,
    active: Arc<AtomicBool>,
    stopped: Arc<AtomicUsize>,
}

impl InMemoryChangeFeed {
    fn deactivate(&self) -> bool {
        let was_active = self.active.swap(false, Ordering::SeqCst);
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).clear();
        was_active
    }
}

impl ChangeFeed for InMemoryChangeFeed {
    fn poll(&mut self) -> Option<ChangeEvent> {
        if !self.active.load(Ordering::SeqCst) {
            return None;
        }
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).pop_front()
    }

    fn stop(&mut self) {
        if self.deactivate() {
            self.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_stopped(&self) -> bool {
        !self.active.load(Ordering::SeqCst)
    }
}

impl Drop for InMemoryChangeFeed {
    fn drop(&mut self) {
        self.deactivate();
    }
}

fn document_id(document: &Value) -> Option<DocumentId> {
    document.get("_id").and_then(DocumentId::from_value)
}

fn position(documents: &[Value], id: &DocumentId) -> Option<usize> {
    documents
        .iter()
        .position(|document| document_id(document).as_ref() == Some(id))
}

fn execute(documents: &[Value], selector: &Selector, options: &QueryOptions) -> Results {
    let mut results: Results = documents
        .iter()
        .filter(|document| selector.matches(document))
        .filter_map(|document| Some((document_id(document)?, document.clone())))
        .collect();
    if let Some(sort) = &options.sort {
        results.sort_by(|(_, a), (_, b)| compare_documents(a, b, sort));
    }
    results.truncate(options.limit);
    results
}

/// Re-run every live query on `collection` and queue what changed. Live
/// selectors were compiled when the query was registered, so this cannot
/// fail once the write is committed.
fn notify(state: &mut StoreState, collection: &str) {
    let StoreState { collections, live } = state;
    let documents = collections.get(collection).map(Vec::as_slice).unwrap_or(&[]);

    live.retain(|query| query.active.load(Ordering::SeqCst));
    for query in live.iter_mut().filter(|q| q.collection == collection) {
        let results = execute(documents, &query.selector, &query.options);
        let events = diff(&query.results, &results);
        query.results = results;
        if !events.is_empty() {
            tracing::trace!(collection, events = events.len(), "live query changed");
            query
                .queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend(events);
        }
    }
}

/// Events that turn the `old` result sequence into `new`.
///
/// Documents that left are removed first. Retained documents whose relative
/// order changed are removed and re-added. Additions are emitted from the
/// end of `new` backwards so every `before` hint names a document the
/// consumer already holds.
fn diff(old: &Results, new: &Results) -> Vec<ChangeEvent> {
    let old_ids: HashSet<&DocumentId> = old.iter().map(|(id, _)| id).collect();
    let new_ids: HashSet<&DocumentId> = new.iter().map(|(id, _)| id).collect();

    let retained_old: Vec<&DocumentId> = old
        .iter()
        .map(|(id, _)| id)
        .filter(|id| new_ids.contains(id))
        .collect();
    let retained_new: Vec<&DocumentId> = new
        .iter()
        .map(|(id, _)| id)
        .filter(|id| old_ids.contains(id))
        .collect();
    let moved: HashSet<&DocumentId> = retained_old
        .iter()
        .zip(&retained_new)
        .filter(|(a, b)| a != b)
        .map(|(a, _)| *a)
        .collect();

    let mut events = Vec::new();
    for (id, _) in old {
        if !new_ids.contains(id) || moved.contains(id) {
            events.push(ChangeEvent::Removed { id: id.clone() });
        }
    }

    let previous: HashMap<&DocumentId, &Value> = old.iter().map(|(id, doc)| (id, doc)).collect();
    for (id, document) in new {
        if moved.contains(id) {
            continue;
        }
        if let Some(before) = previous.get(id) {
            if *before != document {
                events.push(ChangeEvent::Changed {
                    id: id.clone(),
                    fields: document.clone(),
                });
            }
        }
    }

    for (index, (id, document)) in new.iter().enumerate().rev() {
        if old_ids.contains(id) && !moved.contains(id) {
            continue;
        }
        events.push(ChangeEvent::Added {
            id: id.clone(),
            fields: document.clone(),
            before: new.get(index + 1).map(|(next, _)| next.clone()),
        });
    }

    events
}
