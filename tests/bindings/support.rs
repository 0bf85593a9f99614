//! Shared fixtures: a small order book with customers.

use std::sync::Arc;

use docbind::{Binding, BindingContext, BindingEvent, EventLog, InMemoryDocumentStore, Model};
use serde_json::json;

/// Orders o1..o3 and two customers, one of them keyed by an object id.
pub fn seeded_store() -> InMemoryDocumentStore {
    let store = InMemoryDocumentStore::new();
    store
        .insert(
            "Orders",
            json!({"_id": "o1", "customerId": "c1", "total": 40, "status": "open", "items": ["a", "b", "c"]}),
        )
        .unwrap();
    store
        .insert(
            "Orders",
            json!({"_id": "o2", "customerId": {"$oid": "5f2a"}, "total": 15, "status": "shipped", "items": ["d"]}),
        )
        .unwrap();
    store
        .insert(
            "Orders",
            json!({"_id": "o3", "customerId": "c1", "total": 90, "status": "open", "items": []}),
        )
        .unwrap();
    store
        .insert("Customers", json!({"_id": "c1", "name": "Acme"}))
        .unwrap();
    store
        .insert("Customers", json!({"_id": {"$oid": "5f2a"}, "name": "Globex"}))
        .unwrap();
    store
}

pub fn model() -> (InMemoryDocumentStore, Model) {
    let store = seeded_store();
    let model = Model::new(store.clone());
    (store, model)
}

pub fn paths(contexts: &[Arc<BindingContext>]) -> Vec<String> {
    contexts.iter().map(|c| c.path().to_string()).collect()
}

pub fn record<B: Binding>(binding: &B) -> EventLog<BindingEvent> {
    EventLog::attach(binding.events())
}
