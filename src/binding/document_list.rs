use std::sync::Arc;

use super::{page, Binding, BindingCore, ListBindingOps};
use crate::context::BindingContext;
use crate::error::BindingError;
use crate::events::{BindingEvent, ChangeReason, EventHub};
use crate::model::Model;
use crate::path::PathComponents;
use crate::query::{FilterSpec, SortSpec};
use crate::sync::{Subscription, SyncMode};

/// A live, ordered list of the documents of one collection.
///
/// Construction runs the query and applies its initial result, so the
/// contexts are available right away. Later store changes are applied by
/// [`process_changes`](Binding::process_changes).
pub struct DocumentListBinding {
    path: String,
    components: PathComponents,
    sorters: Vec<SortSpec>,
    filters: Vec<FilterSpec>,
    core: BindingCore,
}

impl DocumentListBinding {
    pub(crate) fn new(
        model: Model,
        path: &str,
        sorters: Vec<SortSpec>,
        filters: Vec<FilterSpec>,
    ) -> Result<Self, BindingError> {
        let components = model.path_components(path, None)?;
        let collection_path = format!("/{}", components.collection_name);
        let mut binding = Self {
            path: path.to_string(),
            components,
            sorters,
            filters,
            core: BindingCore::new(model, SyncMode::DocumentList { collection_path }),
        };
        binding.run_query();
        Ok(binding)
    }

    pub fn filters(&self) -> &[FilterSpec] {
        &self.filters
    }

    pub fn sorters(&self) -> &[SortSpec] {
        &self.sorters
    }

    /// The live subscription, if a query is running.
    pub fn subscription(&self) -> Option<&Subscription> {
        self.core.sync.subscription()
    }

    fn run_query(&mut self) {
        if self.core.is_destroyed() {
            return;
        }
        tracing::debug!(
            path = %self.path,
            filters = self.filters.len(),
            sorters = self.sorters.len(),
            "running list query"
        );
        self.core.run(&self.components, &self.sorters, &self.filters);
    }
}

impl Binding for DocumentListBinding {
    fn path(&self) -> &str {
        &self.path
    }

    fn context(&self) -> Option<&Arc<BindingContext>> {
        None
    }

    fn events(&self) -> &EventHub<BindingEvent> {
        &self.core.events
    }

    fn process_changes(&mut self) -> usize {
        self.core.process()
    }

    fn refresh(&mut self, force: bool) {
        if force {
            self.run_query();
        } else {
            self.core.events.emit(&BindingEvent::Change(ChangeReason::Refresh));
        }
    }

    fn destroy(&mut self) {
        self.core.destroy();
    }

    fn is_destroyed(&self) -> bool {
        self.core.is_destroyed()
    }
}

impl ListBindingOps for DocumentListBinding {
    fn get_contexts(
        &mut self,
        start: Option<usize>,
        length: Option<usize>,
    ) -> Vec<Arc<BindingContext>> {
        page(self.core.sync.contexts(), start, length, self.core.model.size_limit())
    }

    fn current_contexts(&self) -> Vec<Arc<BindingContext>> {
        self.core.sync.contexts().to_vec()
    }

    fn len(&self) -> usize {
        self.core.sync.len()
    }

    fn filter(&mut self, filters: Vec<FilterSpec>) -> &mut Self {
        self.filters = filters;
        self.run_query();
        self
    }

    fn sort(&mut self, sorters: Vec<SortSpec>) -> &mut Self {
        self.sorters = sorters;
        self.run_query();
        self
    }
}

impl Drop for DocumentListBinding {
    fn drop(&mut self) {
        self.core.destroy();
    }
}
