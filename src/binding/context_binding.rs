use std::sync::Arc;

use super::{same_context, Binding, BindingCore};
use crate::context::BindingContext;
use crate::error::BindingError;
use crate::events::{BindingEvent, ChangeReason, EventHub};
use crate::model::Model;
use crate::sync::SyncMode;

/// A binding to one document, e.g. an object header bound to
/// `/Orders(1)`.
///
/// Observes the document so that changes and removal raise events, and
/// exposes the canonical element context for nested bindings.
pub struct ContextBinding {
    path: String,
    context: Option<Arc<BindingContext>>,
    element_context: Arc<BindingContext>,
    core: BindingCore,
}

impl ContextBinding {
    pub(crate) fn new(
        model: Model,
        path: &str,
        context: Option<Arc<BindingContext>>,
    ) -> Result<Self, BindingError> {
        let components = model.path_components(path, context.as_deref())?;
        let element_context = model.create_binding_context(path, context.as_deref());
        let mut binding = Self {
            path: path.to_string(),
            context,
            element_context,
            core: BindingCore::new(model, SyncMode::Single),
        };
        binding.core.run(&components, &[], &[]);
        Ok(binding)
    }

    /// The context of the bound document.
    pub fn element_context(&self) -> &Arc<BindingContext> {
        &self.element_context
    }

    /// Recreate the element context and announce it.
    pub fn initialize(&mut self) {
        self.element_context = self.create_element_context();
        self.fire_change();
    }

    /// Rebind against a new parent context. Re-runs the query and raises a
    /// change when the element context differs.
    pub fn set_context(&mut self, context: Option<Arc<BindingContext>>) {
        if same_context(self.context.as_ref(), context.as_ref()) {
            return;
        }
        self.context = context;

        match self.core.model.path_components(&self.path, self.context.as_deref()) {
            Ok(components) => {
                self.core.run(&components, &[], &[]);
            }
            Err(_) => self.core.clear(),
        }

        let element_context = self.create_element_context();
        if !Arc::ptr_eq(&element_context, &self.element_context) {
            self.element_context = element_context;
            self.fire_change();
        }
    }

    fn create_element_context(&self) -> Arc<BindingContext> {
        self.core
            .model
            .create_binding_context(&self.path, self.context.as_deref())
    }

    fn fire_change(&self) {
        self.core.events.emit(&BindingEvent::Change(ChangeReason::Change));
    }
}

impl Binding for ContextBinding {
    fn path(&self) -> &str {
        &self.path
    }

    fn context(&self) -> Option<&Arc<BindingContext>> {
        self.context.as_ref()
    }

    fn events(&self) -> &EventHub<BindingEvent> {
        &self.core.events
    }

    fn process_changes(&mut self) -> usize {
        self.core.process()
    }

    /// Recreate the element context; raise a change only when it differs or
    /// when forced.
    fn refresh(&mut self, force: bool) {
        let element_context = self.create_element_context();
        if force || !Arc::ptr_eq(&element_context, &self.element_context) {
            self.element_context = element_context;
            self.fire_change();
        }
    }

    fn destroy(&mut self) {
        self.core.destroy();
    }

    fn is_destroyed(&self) -> bool {
        self.core.is_destroyed()
    }
}

impl Drop for ContextBinding {
    fn drop(&mut self) {
        self.core.destroy();
    }
}
