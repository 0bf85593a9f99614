//! Integration tests for bindings over the in-memory document store.

mod support;
mod context_binding;
mod document_list;
mod property_binding;
mod property_list;
