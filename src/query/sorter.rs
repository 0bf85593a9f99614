use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client-side comparison function. Live queries sort in the store, so these
/// are rejected by the compiler.
pub type SortComparator = Arc<dyn Fn(&Value, &Value) -> Ordering + Send + Sync>;

/// A declarative sort on one top-level property.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSpec {
    pub property_path: String,
    #[serde(default)]
    pub descending: bool,
    #[serde(skip)]
    pub comparator: Option<SortComparator>,
}

impl SortSpec {
    pub fn ascending(property_path: impl Into<String>) -> Self {
        Self {
            property_path: property_path.into(),
            descending: false,
            comparator: None,
        }
    }

    pub fn descending(property_path: impl Into<String>) -> Self {
        Self {
            descending: true,
            ..Self::ascending(property_path)
        }
    }

    pub fn with_comparator<F>(mut self, compare: F) -> Self
    where
        F: Fn(&Value, &Value) -> Ordering + Send + Sync + 'static,
    {
        self.comparator = Some(Arc::new(compare));
        self
    }
}

impl fmt::Debug for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortSpec")
            .field("property_path", &self.property_path)
            .field("descending", &self.descending)
            .field("comparator", &self.comparator.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Compiled sort order: property name to `1` (ascending) or `-1`
/// (descending), in priority order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SortSpecifier(IndexMap<String, i32>);

impl SortSpecifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, property: impl Into<String>, descending: bool) {
        self.0.insert(property.into(), if descending { -1 } else { 1 });
    }

    pub fn get(&self, property: &str) -> Option<i32> {
        self.0.get(property).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(*v)))
                .collect(),
        )
    }
}
