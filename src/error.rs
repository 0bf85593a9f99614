use thiserror::Error;

/// Errors raised while resolving paths, compiling queries or materializing
/// binding results.
///
/// Only [`BindingError::PathSyntax`] ever crosses the binding contract as an
/// `Err`. Every other kind is reported through the diagnostic channel
/// (`tracing::error!`) plus a `ParseError` / `RequestFailed` event, and the
/// operation carries on with what it could compile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("cannot find root element (collection) in path `{path}`: {reason}")]
    PathSyntax { path: String, reason: &'static str },

    #[error("multi filters are not supported by list bindings (filter on `{path}`)")]
    MultiFilterUnsupported { path: String },

    #[error("filter operator {operator} not supported")]
    UnsupportedFilterOperator { path: String, operator: String },

    #[error("unsupported list sorting path: {path}")]
    UnsupportedSortPath { path: String },

    #[error("custom sort comparator functions are unsupported (sorter on `{path}`)")]
    CustomComparatorUnsupported { path: String },

    #[error("{path} is not an array")]
    ArrayShape { path: String },

    #[error("sorting and filtering not supported for binding to arrays")]
    ArrayQueryUnsupported,

    #[error("unknown collection `{0}`")]
    UnknownCollection(String),

    #[error("document store error: {0}")]
    Store(#[from] StoreError),

    #[error("model has been destroyed")]
    ModelDestroyed,
}

impl BindingError {
    pub(crate) fn path_syntax(path: impl Into<String>, reason: &'static str) -> Self {
        BindingError::PathSyntax {
            path: path.into(),
            reason,
        }
    }
}

/// Errors raised by a [`DocumentStore`](crate::DocumentStore) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store lock poisoned during {0}")]
    LockPoisoned(&'static str),

    #[error("document in `{collection}` is missing an `_id`")]
    MissingId { collection: String },

    #[error("invalid selector: {0}")]
    InvalidSelector(String),
}
