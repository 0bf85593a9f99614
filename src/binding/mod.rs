//! Bindings - the objects a UI consumer reads values and contexts from.
//!
//! Every variant implements [`Binding`]; list variants add
//! [`ListBindingOps`]. Query-backed variants share a `BindingCore` that owns
//! the [`ChangeSynchronizer`] and turns its notifications into events.

mod context_binding;
mod document_list;
mod property_binding;
mod property_list;

use std::sync::Arc;

use crate::context::BindingContext;
use crate::error::BindingError;
use crate::events::{BindingEvent, EventHub};
use crate::model::Model;
use crate::path::PathComponents;
use crate::query::{FilterSpec, SortSpec};
use crate::store::Cursor;
use crate::sync::{ChangeSynchronizer, Notification, SyncMode, SyncState};

pub use context_binding::ContextBinding;
pub use document_list::DocumentListBinding;
pub use property_binding::PropertyBinding;
pub use property_list::PropertyListBinding;

/// Capabilities shared by every binding.
pub trait Binding {
    /// The path as given, before resolution.
    fn path(&self) -> &str;

    fn context(&self) -> Option<&Arc<BindingContext>>;

    fn events(&self) -> &EventHub<BindingEvent>;

    /// Apply pending store changes and raise the matching events. Returns
    /// how many notifications were produced.
    fn process_changes(&mut self) -> usize;

    /// Re-derive the binding's data. `force` re-runs queries and raises a
    /// change even when nothing differs.
    fn refresh(&mut self, force: bool);

    /// Release the subscription. Idempotent.
    fn destroy(&mut self);

    fn is_destroyed(&self) -> bool;
}

/// Capabilities of list bindings.
pub trait ListBindingOps: Binding {
    /// Contexts in `start..start + length`. `start` defaults to 0 and
    /// `length` to the model's size limit minus `start`.
    fn get_contexts(
        &mut self,
        start: Option<usize>,
        length: Option<usize>,
    ) -> Vec<Arc<BindingContext>>;

    /// The contexts as last computed, without touching the store.
    fn current_contexts(&self) -> Vec<Arc<BindingContext>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `len` is final. The count of a limited live query is never
    /// known up front.
    fn is_length_final(&self) -> bool {
        false
    }

    fn filter(&mut self, filters: Vec<FilterSpec>) -> &mut Self;

    fn sort(&mut self, sorters: Vec<SortSpec>) -> &mut Self;
}

/// A list binding, selected by [`Model::bind_list`] from whether a parent
/// context was supplied.
pub enum ListBinding {
    /// Documents of a collection.
    Documents(DocumentListBinding),
    /// Elements of an array property of one document.
    Property(PropertyListBinding),
}

impl ListBinding {
    pub fn as_documents(&self) -> Option<&DocumentListBinding> {
        match self {
            ListBinding::Documents(binding) => Some(binding),
            ListBinding::Property(_) => None,
        }
    }

    pub fn as_property(&self) -> Option<&PropertyListBinding> {
        match self {
            ListBinding::Property(binding) => Some(binding),
            ListBinding::Documents(_) => None,
        }
    }
}

macro_rules! delegate {
    ($self:ident, $binding:ident => $call:expr) => {
        match $self {
            ListBinding::Documents($binding) => $call,
            ListBinding::Property($binding) => $call,
        }
    };
}

impl Binding for ListBinding {
    fn path(&self) -> &str {
        delegate!(self, b => b.path())
    }

    fn context(&self) -> Option<&Arc<BindingContext>> {
        delegate!(self, b => b.context())
    }

    fn events(&self) -> &EventHub<BindingEvent> {
        delegate!(self, b => b.events())
    }

    fn process_changes(&mut self) -> usize {
        delegate!(self, b => b.process_changes())
    }

    fn refresh(&mut self, force: bool) {
        delegate!(self, b => b.refresh(force))
    }

    fn destroy(&mut self) {
        delegate!(self, b => b.destroy())
    }

    fn is_destroyed(&self) -> bool {
        delegate!(self, b => b.is_destroyed())
    }
}

impl ListBindingOps for ListBinding {
    fn get_contexts(
        &mut self,
        start: Option<usize>,
        length: Option<usize>,
    ) -> Vec<Arc<BindingContext>> {
        delegate!(self, b => b.get_contexts(start, length))
    }

    fn current_contexts(&self) -> Vec<Arc<BindingContext>> {
        delegate!(self, b => b.current_contexts())
    }

    fn len(&self) -> usize {
        delegate!(self, b => b.len())
    }

    fn filter(&mut self, filters: Vec<FilterSpec>) -> &mut Self {
        delegate!(self, b => { b.filter(filters); });
        self
    }

    fn sort(&mut self, sorters: Vec<SortSpec>) -> &mut Self {
        delegate!(self, b => { b.sort(sorters); });
        self
    }
}

/// State shared by query-backed bindings.
struct BindingCore {
    model: Model,
    events: Arc<EventHub<BindingEvent>>,
    sync: ChangeSynchronizer,
    cursor: Option<Cursor>,
}

impl BindingCore {
    fn new(model: Model, mode: SyncMode) -> Self {
        let events = Arc::new(EventHub::new());
        model.register_binding(&events);
        Self {
            model,
            events,
            sync: ChangeSynchronizer::new(mode),
            cursor: None,
        }
    }

    /// Stop any previous subscription, then issue the query and apply its
    /// initial result. Returns whether a subscription is now attached.
    fn run(
        &mut self,
        components: &PathComponents,
        sorters: &[SortSpec],
        filters: &[FilterSpec],
    ) -> bool {
        let reset = self.sync.begin_query();
        self.dispatch(reset);
        self.cursor = None;

        match self.model.subscribe(components, sorters, filters, &self.events) {
            Ok((cursor, subscription)) => {
                self.cursor = Some(cursor);
                self.sync.attach(subscription);
                self.process();
                true
            }
            Err(error) => {
                self.sync.abandon_query();
                self.fail(&error);
                false
            }
        }
    }

    /// Stop the subscription without issuing a new query.
    fn clear(&mut self) {
        let reset = self.sync.begin_query();
        self.sync.abandon_query();
        self.cursor = None;
        self.dispatch(reset);
    }

    fn process(&mut self) -> usize {
        let notifications = self.sync.pump(&self.model);
        self.dispatch(notifications)
    }

    fn dispatch(&self, notifications: Vec<Notification>) -> usize {
        let count = notifications.len();
        for notification in notifications {
            match notification {
                Notification::DataReceived => self.events.emit(&BindingEvent::DataReceived),
                Notification::Change(reason) => self.events.emit(&BindingEvent::Change(reason)),
                Notification::RefreshRequested => self.model.refresh(),
            }
        }
        count
    }

    /// Report a query that could not be issued. Diagnostics already raised
    /// by the model are not repeated.
    fn fail(&self, error: &BindingError) {
        match error {
            BindingError::ModelDestroyed => tracing::debug!("query skipped, model destroyed"),
            BindingError::UnknownCollection(_) | BindingError::PathSyntax { .. } => {}
            other => {
                tracing::error!(error = %other, "query failed");
                self.events.emit(&BindingEvent::RequestFailed(other.to_string()));
            }
        }
    }

    fn destroy(&mut self) {
        self.sync.destroy();
        self.cursor = None;
    }

    fn is_destroyed(&self) -> bool {
        self.sync.state() == SyncState::Destroyed
    }
}

fn page(
    contexts: &[Arc<BindingContext>],
    start: Option<usize>,
    length: Option<usize>,
    size_limit: usize,
) -> Vec<Arc<BindingContext>> {
    let start = start.unwrap_or(0);
    let length = length.unwrap_or_else(|| size_limit.saturating_sub(start));
    contexts.iter().skip(start).take(length).cloned().collect()
}

fn same_context(a: Option<&Arc<BindingContext>>, b: Option<&Arc<BindingContext>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}
