use serde::Deserialize;

pub const DEFAULT_SIZE_LIMIT: usize = 100;

/// Settings shared by every binding of a [`Model`](super::Model).
///
/// Deserializable so it can be loaded from JSON; missing fields take their
/// defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModelConfig {
    /// Maximum number of documents or array elements materialized per query.
    pub size_limit: usize,
    /// Promote relative paths without a context to the root.
    pub legacy_syntax: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            size_limit: DEFAULT_SIZE_LIMIT,
            legacy_syntax: false,
        }
    }
}

impl ModelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the size limit. Zero is not a usable limit and falls back to the
    /// default.
    pub fn with_size_limit(mut self, size_limit: usize) -> Self {
        self.size_limit = size_limit;
        self.normalized()
    }

    pub fn with_legacy_syntax(mut self, legacy_syntax: bool) -> Self {
        self.legacy_syntax = legacy_syntax;
        self
    }

    pub(crate) fn normalized(mut self) -> Self {
        if self.size_limit == 0 {
            tracing::warn!(default = DEFAULT_SIZE_LIMIT, "size limit of 0 ignored");
            self.size_limit = DEFAULT_SIZE_LIMIT;
        }
        self
    }
}
