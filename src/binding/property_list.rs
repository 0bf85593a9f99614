use std::sync::Arc;

use serde_json::Value;

use super::{page, Binding, BindingCore, ListBindingOps};
use crate::context::{BindingContext, ContextSource};
use crate::error::BindingError;
use crate::events::{BindingEvent, ChangeReason, EventHub};
use crate::model::Model;
use crate::path::{value_at, PathComponents};
use crate::query::{FilterSpec, SortSpec};
use crate::sync::SyncMode;

/// A list over the elements of an array property of one document.
///
/// The query tracks the owning document; element contexts
/// (`/Orders(1)/items[0]`, ...) are rebuilt from the document on every
/// [`get_contexts`](ListBindingOps::get_contexts) call. Sorting and filtering
/// are not supported: asking for either raises `RequestFailed`, and asking
/// at construction leaves the binding inert.
pub struct PropertyListBinding {
    path: String,
    parent: Arc<BindingContext>,
    resolved: String,
    components: PathComponents,
    contexts: Vec<Arc<BindingContext>>,
    inert: bool,
    core: BindingCore,
}

impl PropertyListBinding {
    pub(crate) fn new(
        model: Model,
        path: &str,
        parent: Arc<BindingContext>,
        sorters: Vec<SortSpec>,
        filters: Vec<FilterSpec>,
    ) -> Result<Self, BindingError> {
        let components = model.path_components(path, Some(&*parent))?;
        let resolved = model
            .resolve(path, Some(&*parent))
            .unwrap_or_else(|| components.to_path());

        let mut binding = Self {
            path: path.to_string(),
            parent,
            resolved,
            components,
            contexts: Vec::new(),
            inert: false,
            core: BindingCore::new(model, SyncMode::PropertyList),
        };

        if !sorters.is_empty() || !filters.is_empty() {
            binding.inert = true;
            binding.reject();
        } else {
            binding.core.run(&binding.components, &[], &[]);
        }
        Ok(binding)
    }

    /// The absolute path of the array property.
    pub fn resolved_path(&self) -> &str {
        &self.resolved
    }

    /// Whether sorters or filters at construction left this binding without
    /// a query.
    pub fn is_inert(&self) -> bool {
        self.inert
    }

    fn reject(&mut self) {
        let error = BindingError::ArrayQueryUnsupported;
        tracing::error!(path = %self.resolved, error = %error, "request failed");
        self.core.events.emit(&BindingEvent::RequestFailed(error.to_string()));
    }

    fn materialize(&self) -> Vec<Arc<BindingContext>> {
        let Some(cursor) = self.core.cursor.as_ref() else {
            return Vec::new();
        };
        let document = match cursor.first() {
            Ok(Some(document)) => document,
            Ok(None) => return Vec::new(),
            Err(error) => {
                tracing::error!(path = %self.resolved, error = %error, "fetch failed");
                self.core.events.emit(&BindingEvent::RequestFailed(error.to_string()));
                return Vec::new();
            }
        };

        match value_at(&document, &self.components.property_path) {
            Some(Value::Array(items)) => (0..items.len())
                .map(|index| {
                    self.core
                        .model
                        .context_for(&format!("{}[{}]", self.resolved, index))
                })
                .collect(),
            _ => {
                let error = BindingError::ArrayShape {
                    path: self.resolved.clone(),
                };
                tracing::error!(error = %error, "array binding");
                self.core.events.emit(&BindingEvent::ParseError(error.to_string()));
                Vec::new()
            }
        }
    }
}

impl Binding for PropertyListBinding {
    fn path(&self) -> &str {
        &self.path
    }

    fn context(&self) -> Option<&Arc<BindingContext>> {
        Some(&self.parent)
    }

    fn events(&self) -> &EventHub<BindingEvent> {
        &self.core.events
    }

    fn process_changes(&mut self) -> usize {
        self.core.process()
    }

    fn refresh(&mut self, force: bool) {
        if force && !self.inert && !self.core.is_destroyed() {
            self.core.run(&self.components, &[], &[]);
        } else {
            self.core.events.emit(&BindingEvent::Change(ChangeReason::Refresh));
        }
    }

    fn destroy(&mut self) {
        self.core.destroy();
        self.contexts.clear();
    }

    fn is_destroyed(&self) -> bool {
        self.core.is_destroyed()
    }
}

impl ListBindingOps for PropertyListBinding {
    fn get_contexts(
        &mut self,
        start: Option<usize>,
        length: Option<usize>,
    ) -> Vec<Arc<BindingContext>> {
        self.contexts = self.materialize();
        page(&self.contexts, start, length, self.core.model.size_limit())
    }

    fn current_contexts(&self) -> Vec<Arc<BindingContext>> {
        self.contexts.clone()
    }

    fn len(&self) -> usize {
        self.contexts.len()
    }

    fn filter(&mut self, _filters: Vec<FilterSpec>) -> &mut Self {
        self.reject();
        self
    }

    fn sort(&mut self, _sorters: Vec<SortSpec>) -> &mut Self {
        self.reject();
        self
    }
}

impl Drop for PropertyListBinding {
    fn drop(&mut self) {
        self.core.destroy();
    }
}
