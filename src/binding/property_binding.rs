use std::sync::Arc;

use serde_json::Value;

use super::{same_context, Binding};
use crate::context::BindingContext;
use crate::error::BindingError;
use crate::events::{BindingEvent, ChangeReason, EventHub};
use crate::model::Model;

/// A read-only view of one value.
///
/// Holds no subscription; the value is read from the store on demand and
/// [`check_update`](Self::check_update) raises a change when it moved.
pub struct PropertyBinding {
    model: Model,
    path: String,
    context: Option<Arc<BindingContext>>,
    value: Option<Value>,
    events: Arc<EventHub<BindingEvent>>,
    destroyed: bool,
}

impl PropertyBinding {
    pub(crate) fn new(
        model: Model,
        path: &str,
        context: Option<Arc<BindingContext>>,
    ) -> Result<Self, BindingError> {
        if !path.starts_with('?') && model.resolve(path, context.as_deref()).is_some() {
            model.path_components(path, context.as_deref())?;
        }

        let events = Arc::new(EventHub::new());
        model.register_binding(&events);
        let mut binding = Self {
            model,
            path: path.to_string(),
            context,
            value: None,
            events,
            destroyed: false,
        };
        binding.value = binding.read();
        Ok(binding)
    }

    /// The current value, read from the store.
    pub fn get_value(&self) -> Option<Value> {
        self.read()
    }

    /// Re-read the value and raise a change if it differs from the last one
    /// seen, or always when `force` is set. Returns whether a change was
    /// raised.
    pub fn check_update(&mut self, force: bool) -> bool {
        if self.destroyed {
            return false;
        }
        let value = self.read();
        if !force && value == self.value {
            return false;
        }
        self.value = value;
        self.events.emit(&BindingEvent::Change(ChangeReason::Change));
        true
    }

    pub fn set_context(&mut self, context: Option<Arc<BindingContext>>) {
        if same_context(self.context.as_ref(), context.as_ref()) {
            return;
        }
        self.context = context;
        self.check_update(false);
    }

    fn read(&self) -> Option<Value> {
        match self.model.get_property(&self.path, self.context.as_deref()) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(path = %self.path, error = %error, "property read failed");
                None
            }
        }
    }
}

impl Binding for PropertyBinding {
    fn path(&self) -> &str {
        &self.path
    }

    fn context(&self) -> Option<&Arc<BindingContext>> {
        self.context.as_ref()
    }

    fn events(&self) -> &EventHub<BindingEvent> {
        &self.events
    }

    fn process_changes(&mut self) -> usize {
        usize::from(self.check_update(false))
    }

    fn refresh(&mut self, force: bool) {
        self.check_update(force);
    }

    fn destroy(&mut self) {
        self.destroyed = true;
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}
