//! Queries - compiling declarative filters and sorters into store queries.
//!
//! ## Example
//!
//! ```
//! use docbind::query::{compile_selector, FilterOperator, FilterSpec};
//! use serde_json::json;
//!
//! let compiled = compile_selector(&[
//!     FilterSpec::new("age", FilterOperator::GE, 18),
//!     FilterSpec::new("country", FilterOperator::EQ, "NZ"),
//! ]);
//! assert_eq!(
//!     compiled.value,
//!     json!({"$and": [{"age": {"$gte": 18}}, {"country": "NZ"}]})
//! );
//! ```

mod compiler;
mod filter;
mod sorter;

use serde::Serialize;
use serde_json::Value;

pub use compiler::{compile_query, compile_selector, compile_sort, Compiled};
pub use filter::{FilterOperator, FilterSpec};
pub use sorter::{SortComparator, SortSpec, SortSpecifier};

/// A backend-agnostic query: which documents, how many, in what order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuerySpec {
    pub selector: Value,
    pub options: QueryOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOptions {
    pub limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortSpecifier>,
}

impl QuerySpec {
    /// Select everything, up to `limit` documents, in store order.
    pub fn all(limit: usize) -> Self {
        Self {
            selector: Value::Object(Default::default()),
            options: QueryOptions { limit, sort: None },
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
