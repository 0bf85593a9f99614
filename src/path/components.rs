use std::fmt;

use serde_json::{json, Value};

use crate::error::BindingError;

/// Identifier of a single document.
///
/// Documents created by the application carry plain string ids. Documents
/// created outside of it (shell, external tooling) carry structured object
/// ids, written in paths as `ObjectID("5f1d...")` and stored as
/// `{"$oid": "5f1d..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentId {
    Str(String),
    ObjectId(String),
}

impl DocumentId {
    /// Parse the content found between the parentheses of a collection
    /// segment.
    ///
    /// A quoted id is always a plain string, even when it reads like an
    /// object id wrapper.
    pub fn parse(raw: &str) -> Self {
        let unquoted = strip_quotes(raw);
        if unquoted.len() != raw.len() {
            return DocumentId::Str(unquoted.to_string());
        }
        if let Some(rest) = raw.strip_prefix("Object") {
            if let Some(open) = rest.find(|c: char| c == '"' || c == '\'') {
                let quote = &rest[open..open + 1];
                let inner = &rest[open + 1..];
                let end = inner.find(quote).unwrap_or(inner.len());
                return DocumentId::ObjectId(inner[..end].to_string());
            }
        }
        DocumentId::Str(raw.to_string())
    }

    /// Read an identifier out of a stored document field.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(DocumentId::Str(s.clone())),
            Value::Object(map) => map
                .get("$oid")
                .and_then(Value::as_str)
                .map(|hex| DocumentId::ObjectId(hex.to_string())),
            Value::Number(n) => Some(DocumentId::Str(n.to_string())),
            _ => None,
        }
    }

    /// The stored representation, as used in `_id` selectors.
    pub fn to_value(&self) -> Value {
        match self {
            DocumentId::Str(s) => Value::String(s.clone()),
            DocumentId::ObjectId(hex) => json!({ "$oid": hex }),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DocumentId::Str(s) | DocumentId::ObjectId(s) => s,
        }
    }

    pub fn is_object_id(&self) -> bool {
        matches!(self, DocumentId::ObjectId(_))
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentId::Str(s) if needs_quotes(s) => write!(f, "'{}'", s),
            DocumentId::Str(s) => f.write_str(s),
            DocumentId::ObjectId(hex) => write!(f, "ObjectID(\"{}\")", hex),
        }
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        DocumentId::Str(id.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        DocumentId::Str(id)
    }
}

/// Plain ids that would not parse back to themselves unquoted.
fn needs_quotes(id: &str) -> bool {
    id.starts_with("Object") || id.contains(['(', ')', '\'', '"'])
}

fn strip_quotes(raw: &str) -> &str {
    for quote in ['\'', '"'] {
        if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
            return &raw[1..raw.len() - 1];
        }
    }
    raw
}

/// An absolute path broken down into the pieces a query needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathComponents {
    pub collection_name: String,
    pub document_id: Option<DocumentId>,
    /// Remainder of the path, `.`-separated, resolvable against a document.
    pub property_path: String,
}

impl PathComponents {
    /// Break an absolute (`/...`) or lookup (`?...`) path into components.
    ///
    /// Lookup paths always resolve against the root. Remaining segments after
    /// the collection segment are joined with `.`; a `.` directly following
    /// the first `)` is turned back into `/` so that a lookup sub-path such as
    /// `?Customers(customerId)/name` survives being embedded in a longer path.
    pub fn parse(path: &str) -> Result<Self, BindingError> {
        let absolute = match path.chars().next() {
            Some('?') => format!("/{}", &path[1..]),
            Some('/') => path.to_string(),
            _ => {
                return Err(BindingError::path_syntax(
                    path,
                    "path must start with `/` or `?`",
                ))
            }
        };

        let mut segments = absolute.split('/').filter(|s| !s.is_empty());
        let collection_segment = segments
            .next()
            .ok_or_else(|| BindingError::path_syntax(path, "missing collection segment"))?;

        let (collection_name, document_id) = match collection_segment.find('(') {
            None => (collection_segment.to_string(), None),
            Some(open) => {
                let rest = &collection_segment[open + 1..];
                let inner = rest.strip_suffix(')').ok_or_else(|| {
                    BindingError::path_syntax(path, "unterminated document identifier")
                })?;
                (
                    collection_segment[..open].to_string(),
                    Some(DocumentId::parse(inner)),
                )
            }
        };

        let mut property_path = segments.collect::<Vec<_>>().join(".");
        if let Some(close) = property_path.find(')') {
            if property_path[close + 1..].starts_with('.') {
                property_path.replace_range(close + 1..close + 2, "/");
            }
        }

        Ok(PathComponents {
            collection_name,
            document_id,
            property_path,
        })
    }

    /// `/Collection` or `/Collection(id)`, without the property path.
    pub fn document_path(&self) -> String {
        match &self.document_id {
            Some(id) => format!("/{}({})", self.collection_name, id),
            None => format!("/{}", self.collection_name),
        }
    }

    /// Reassemble a path that parses back to the same components.
    pub fn to_path(&self) -> String {
        if self.property_path.is_empty() {
            self.document_path()
        } else {
            format!("{}/{}", self.document_path(), self.property_path)
        }
    }

    /// Whether the property path is itself a lookup into another collection.
    pub fn has_lookup(&self) -> bool {
        self.property_path.starts_with('?')
    }
}
