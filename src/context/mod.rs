//! Binding contexts - canonical handles to data at one absolute path.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// A handle to the data at one absolute path.
///
/// Contexts carry only their path, never live data, so they can be shared
/// freely between bindings. Within one [`Model`](crate::Model) there is at
/// most one context per path; compare with [`Arc::ptr_eq`].
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct BindingContext {
    path: String,
}

impl BindingContext {
    pub(crate) fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for BindingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Anything that can hand out canonical contexts for absolute paths.
pub trait ContextSource {
    fn context_for(&self, path: &str) -> Arc<BindingContext>;
}

/// Memoizes one [`BindingContext`] per absolute path.
#[derive(Default)]
pub struct ContextCache {
    contexts: Mutex<HashMap<String, Arc<BindingContext>>>,
}

impl ContextCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached context for `path`, creating it on first use.
    pub fn get_or_create(&self, path: &str) -> Arc<BindingContext> {
        let mut contexts = self.contexts.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            contexts
                .entry(path.to_string())
                .or_insert_with(|| Arc::new(BindingContext::new(path))),
        )
    }

    pub fn get(&self, path: &str) -> Option<Arc<BindingContext>> {
        self.contexts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.contexts.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every context. Only the owning model does this, when destroyed.
    pub(crate) fn clear(&self) {
        self.contexts.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl ContextSource for ContextCache {
    fn context_for(&self, path: &str) -> Arc<BindingContext> {
        self.get_or_create(path)
    }
}
