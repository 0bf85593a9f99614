//! Model - the entry point that owns contexts and hands out bindings.
//!
//! A [`Model`] wraps an injected [`DocumentStore`], memoizes one
//! [`BindingContext`] per absolute path, and constructs the binding variant
//! that fits a path.
//!
//! ## Example
//!
//! ```
//! use docbind::{InMemoryDocumentStore, ListBindingOps, Model};
//! use serde_json::json;
//!
//! let store = InMemoryDocumentStore::new();
//! store.insert("Orders", json!({"_id": "o1", "total": 10})).unwrap();
//! store.insert("Orders", json!({"_id": "o2", "total": 25})).unwrap();
//!
//! let model = Model::new(store.clone());
//! let mut orders = model.bind_list("/Orders", None, vec![], vec![]).unwrap();
//! let paths: Vec<String> = orders
//!     .get_contexts(None, None)
//!     .iter()
//!     .map(|c| c.path().to_string())
//!     .collect();
//! assert_eq!(paths, vec!["/Orders(o1)", "/Orders(o2)"]);
//!
//! let total = model.get_property("/Orders(o2)/total", None).unwrap();
//! assert_eq!(total, Some(json!(25)));
//! ```

mod config;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use serde_json::Value;

use crate::binding::{
    ContextBinding, DocumentListBinding, ListBinding, PropertyBinding, PropertyListBinding,
};
use crate::context::{BindingContext, ContextCache, ContextSource};
use crate::error::BindingError;
use crate::events::{BindingEvent, ChangeReason, EventHub, ModelEvent};
use crate::path::{self, value_at, DocumentId, PathComponents};
use crate::query::{compile_query, FilterSpec, SortSpec};
use crate::store::{Cursor, DocumentStore};
use crate::sync::{Subscription, SubscriptionInner};

pub use config::{ModelConfig, DEFAULT_SIZE_LIMIT};

struct ModelInner {
    store: Arc<dyn DocumentStore>,
    config: ModelConfig,
    contexts: ContextCache,
    events: EventHub<ModelEvent>,
    bindings: Mutex<Vec<Weak<EventHub<BindingEvent>>>>,
    subscriptions: Mutex<Vec<Weak<SubscriptionInner>>>,
    destroyed: AtomicBool,
}

/// Binding model over a document store. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

impl Model {
    pub fn new<S: DocumentStore + 'static>(store: S) -> Self {
        Self::with_config(store, ModelConfig::default())
    }

    pub fn with_config<S: DocumentStore + 'static>(store: S, config: ModelConfig) -> Self {
        Self::from_store(Arc::new(store), config)
    }

    pub fn from_store(store: Arc<dyn DocumentStore>, config: ModelConfig) -> Self {
        Self {
            inner: Arc::new(ModelInner {
                store,
                config: config.normalized(),
                contexts: ContextCache::new(),
                events: EventHub::new(),
                bindings: Mutex::new(Vec::new()),
                subscriptions: Mutex::new(Vec::new()),
                destroyed: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.inner.config
    }

    pub fn size_limit(&self) -> usize {
        self.inner.config.size_limit
    }

    pub fn events(&self) -> &EventHub<ModelEvent> {
        &self.inner.events
    }

    pub fn contexts(&self) -> &ContextCache {
        &self.inner.contexts
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }

    /// Resolve `path` against `context` into an absolute path.
    pub fn resolve(&self, path: &str, context: Option<&BindingContext>) -> Option<String> {
        path::resolve(
            path,
            context.map(BindingContext::path),
            self.inner.config.legacy_syntax,
        )
    }

    /// The canonical context for an absolute path.
    pub fn get_context(&self, path: &str) -> Result<Arc<BindingContext>, BindingError> {
        if !path.starts_with('/') {
            return Err(BindingError::path_syntax(path, "context paths must start with `/`"));
        }
        Ok(self.inner.contexts.get_or_create(path))
    }

    /// Resolve `path` against `context` and return its canonical context,
    /// falling back to the root when nothing resolves.
    pub fn create_binding_context(
        &self,
        path: &str,
        context: Option<&BindingContext>,
    ) -> Arc<BindingContext> {
        let resolved = self.resolve(path, context).unwrap_or_else(|| "/".to_string());
        self.inner.contexts.get_or_create(&resolved)
    }

    /// Resolve and parse `path`. A path that does not parse is reported
    /// before the error is returned.
    pub fn path_components(
        &self,
        path: &str,
        context: Option<&BindingContext>,
    ) -> Result<PathComponents, BindingError> {
        let resolved = self.resolve(path, context).ok_or_else(|| {
            BindingError::path_syntax(path, "relative path without a context")
        });
        let parsed = resolved.and_then(|resolved| PathComponents::parse(&resolved));
        if let Err(error) = &parsed {
            self.report(error, None);
        }
        parsed
    }

    /// Compile and issue the query for `path`, returning a cursor over it.
    ///
    /// Filter and sort diagnostics are reported and the offending entries
    /// skipped; the cursor carries whatever did compile.
    pub fn run_query(
        &self,
        path: &str,
        context: Option<&BindingContext>,
        sorters: &[SortSpec],
        filters: &[FilterSpec],
    ) -> Result<Cursor, BindingError> {
        let components = self.path_components(path, context)?;
        self.query(&components, sorters, filters, None)
    }

    /// Read the value at `path`, or the whole document when the path names
    /// one. Lookup paths (`?Customers(customerId)/name`) follow the id held
    /// by `customerId` in the context's document.
    ///
    /// Returns `Ok(None)` when the path does not resolve or nothing is there.
    pub fn get_property(
        &self,
        path: &str,
        context: Option<&BindingContext>,
    ) -> Result<Option<Value>, BindingError> {
        if path.starts_with('?') {
            let Some(context) = context else {
                return Ok(None);
            };
            let owner = PathComponents::parse(context.path())?.document_path();
            return match self.get_property(&owner, None)? {
                Some(document) => self.lookup(&document, path),
                None => Ok(None),
            };
        }

        let Some(resolved) = self.resolve(path, context) else {
            tracing::debug!(path, "unresolvable property path");
            return Ok(None);
        };
        let components = PathComponents::parse(&resolved)?;
        if components.document_id.is_none() {
            return Ok(None);
        }

        let cursor = self.query(&components, &[], &[], None)?;
        let Some(document) = cursor.first()? else {
            return Ok(None);
        };

        if components.property_path.is_empty() {
            Ok(Some(document))
        } else if components.has_lookup() {
            self.lookup(&document, &components.property_path)
        } else {
            Ok(value_at(&document, &components.property_path).cloned())
        }
    }

    /// Same as [`get_property`](Self::get_property); reads whole documents.
    pub fn get_object(
        &self,
        path: &str,
        context: Option<&BindingContext>,
    ) -> Result<Option<Value>, BindingError> {
        self.get_property(path, context)
    }

    fn lookup(&self, document: &Value, lookup_path: &str) -> Result<Option<Value>, BindingError> {
        let lookup = PathComponents::parse(lookup_path)?;
        let Some(key) = lookup.document_id.as_ref() else {
            return Ok(None);
        };
        let Some(id) = value_at(document, key.as_str()).and_then(DocumentId::from_value) else {
            tracing::debug!(key = key.as_str(), "lookup key missing from document");
            return Ok(None);
        };

        let context = self
            .inner
            .contexts
            .get_or_create(&format!("/{}({})", lookup.collection_name, id));
        self.get_property(&lookup.property_path, Some(&context))
    }

    pub fn bind_property(
        &self,
        path: &str,
        context: Option<Arc<BindingContext>>,
    ) -> Result<PropertyBinding, BindingError> {
        PropertyBinding::new(self.clone(), path, context)
    }

    /// Bind a list.
    ///
    /// Without a `parent` the path names a collection and the binding lists
    /// its documents. With a `parent` the path names an array property of
    /// the parent's document and the binding lists its elements.
    pub fn bind_list(
        &self,
        path: &str,
        parent: Option<Arc<BindingContext>>,
        sorters: Vec<SortSpec>,
        filters: Vec<FilterSpec>,
    ) -> Result<ListBinding, BindingError> {
        match parent {
            None => DocumentListBinding::new(self.clone(), path, sorters, filters)
                .map(ListBinding::Documents),
            Some(parent) => PropertyListBinding::new(self.clone(), path, parent, sorters, filters)
                .map(ListBinding::Property),
        }
    }

    pub fn bind_context(
        &self,
        path: &str,
        context: Option<Arc<BindingContext>>,
    ) -> Result<ContextBinding, BindingError> {
        ContextBinding::new(self.clone(), path, context)
    }

    /// Tell every live binding that dependent data must be re-read.
    pub fn refresh(&self) {
        let hubs: Vec<_> = {
            let mut bindings = self.inner.bindings.lock().unwrap_or_else(PoisonError::into_inner);
            bindings.retain(|hub| hub.strong_count() > 0);
            bindings.iter().filter_map(Weak::upgrade).collect()
        };
        tracing::debug!(bindings = hubs.len(), "model refresh");
        for hub in hubs {
            hub.emit(&BindingEvent::Change(ChangeReason::Refresh));
        }
        self.inner.events.emit(&ModelEvent::Refresh);
    }

    /// Stop every live subscription and drop all contexts. Idempotent;
    /// later queries fail with [`BindingError::ModelDestroyed`].
    pub fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        let subscriptions = std::mem::take(
            &mut *self.inner.subscriptions.lock().unwrap_or_else(PoisonError::into_inner),
        );
        let mut stopped = 0;
        for subscription in subscriptions.iter().filter_map(Weak::upgrade) {
            subscription.stop();
            stopped += 1;
        }
        self.inner.bindings.lock().unwrap_or_else(PoisonError::into_inner).clear();
        self.inner.contexts.clear();
        tracing::debug!(stopped, "model destroyed");
        self.inner.events.emit(&ModelEvent::Destroyed);
    }

    pub(crate) fn register_binding(&self, hub: &Arc<EventHub<BindingEvent>>) {
        self.inner
            .bindings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::downgrade(hub));
    }

    /// Compile the query for `components`, reporting diagnostics to the model
    /// and, when given, to a binding.
    pub(crate) fn query(
        &self,
        components: &PathComponents,
        sorters: &[SortSpec],
        filters: &[FilterSpec],
        binding: Option<&EventHub<BindingEvent>>,
    ) -> Result<Cursor, BindingError> {
        if self.is_destroyed() {
            return Err(BindingError::ModelDestroyed);
        }

        let Some(collection) = self.inner.store.collection(&components.collection_name) else {
            let error = BindingError::UnknownCollection(components.collection_name.clone());
            self.report(&error, binding);
            return Err(error);
        };

        let compiled = compile_query(components, sorters, filters, self.size_limit());
        for diagnostic in &compiled.diagnostics {
            self.report(diagnostic, binding);
        }
        tracing::trace!(
            collection = %components.collection_name,
            query = %compiled.value.to_value(),
            "query compiled"
        );
        Ok(Cursor::new(collection, compiled.value))
    }

    /// Issue a query and start observing it.
    pub(crate) fn subscribe(
        &self,
        components: &PathComponents,
        sorters: &[SortSpec],
        filters: &[FilterSpec],
        binding: &EventHub<BindingEvent>,
    ) -> Result<(Cursor, Subscription), BindingError> {
        let cursor = self.query(components, sorters, filters, Some(binding))?;
        let feed = cursor.observe_changes()?;
        let subscription = Subscription::new(cursor.collection_name(), cursor.query().clone(), feed);

        let mut subscriptions = self.inner.subscriptions.lock().unwrap_or_else(PoisonError::into_inner);
        subscriptions.retain(|s| s.strong_count() > 0);
        subscriptions.push(subscription.downgrade());
        Ok((cursor, subscription))
    }

    /// The fatal diagnostic channel: log, then raise `ParseError`.
    pub(crate) fn report(&self, error: &BindingError, binding: Option<&EventHub<BindingEvent>>) {
        let message = error.to_string();
        tracing::error!(error = %message, "binding diagnostic");
        self.inner.events.emit(&ModelEvent::ParseError(message.clone()));
        if let Some(binding) = binding {
            binding.emit(&BindingEvent::ParseError(message));
        }
    }

    #[cfg(test)]
    fn query_spec(
        &self,
        path: &str,
        filters: &[FilterSpec],
    ) -> Result<crate::query::QuerySpec, BindingError> {
        Ok(self.run_query(path, None, &[], filters)?.query().clone())
    }
}

impl ContextSource for Model {
    fn context_for(&self, path: &str) -> Arc<BindingContext> {
        self.inner.contexts.get_or_create(path)
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("config", &self.inner.config)
            .field("contexts", &self.inner.contexts.len())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
