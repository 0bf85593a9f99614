//! Integration tests for the model: context caching, refresh and teardown.

use std::sync::Arc;

use docbind::{
    Binding, BindingError, BindingEvent, ChangeReason, EventLog, InMemoryDocumentStore,
    ListBindingOps, Model, ModelConfig, ModelEvent,
};
use serde_json::json;

fn store() -> InMemoryDocumentStore {
    let store = InMemoryDocumentStore::new();
    store
        .insert("Orders", json!({"_id": "o1", "total": 40, "items": ["a"]}))
        .unwrap();
    store
        .insert("Orders", json!({"_id": "o2", "total": 15, "items": []}))
        .unwrap();
    store
}

#[test]
fn contexts_are_shared_across_bindings() {
    let model = Model::new(store());
    let mut orders = model.bind_list("/Orders", None, vec![], vec![]).unwrap();
    let listed = orders.get_contexts(None, None);

    let direct = model.get_context("/Orders(o1)").unwrap();
    assert!(Arc::ptr_eq(&listed[0], &direct));
    assert!(Arc::ptr_eq(
        &direct,
        &model.create_binding_context("/Orders(o1)", None)
    ));

    let header = model.bind_context("/Orders(o2)", None).unwrap();
    assert!(Arc::ptr_eq(header.element_context(), &listed[1]));
    assert!(model.contexts().get("/Orders(o2)").is_some());
}

#[test]
fn get_context_requires_absolute_path() {
    let model = Model::new(store());
    assert!(matches!(
        model.get_context("Orders(o1)"),
        Err(BindingError::PathSyntax { .. })
    ));
}

#[test]
fn refresh_reaches_every_live_binding() {
    let model = Model::new(store());
    let orders = model.bind_list("/Orders", None, vec![], vec![]).unwrap();
    let header = model.bind_context("/Orders(o1)", None).unwrap();
    let orders_log = EventLog::attach(orders.events());
    let header_log = EventLog::attach(header.events());
    let model_log = EventLog::attach(model.events());

    model.refresh();

    let refresh = vec![BindingEvent::Change(ChangeReason::Refresh)];
    assert_eq!(orders_log.events(), refresh);
    assert_eq!(header_log.events(), refresh);
    assert_eq!(model_log.events(), vec![ModelEvent::Refresh]);

    // Dropped bindings are no longer reached.
    drop(orders);
    model.refresh();
    assert_eq!(header_log.events().len(), 2);
}

#[test]
fn destroy_stops_every_subscription() {
    let store = store();
    let model = Model::new(store.clone());
    let mut orders = model.bind_list("/Orders", None, vec![], vec![]).unwrap();
    let _header = model.bind_context("/Orders(o1)", None).unwrap();
    let model_log = EventLog::attach(model.events());
    assert_eq!(store.active_subscriptions(), 2);

    model.destroy();
    model.destroy();

    assert!(model.is_destroyed());
    assert_eq!(store.active_subscriptions(), 0);
    assert!(model.contexts().is_empty());
    assert_eq!(model_log.events(), vec![ModelEvent::Destroyed]);

    // Re-querying a binding of a destroyed model issues nothing.
    orders.refresh(true);
    assert!(orders.current_contexts().is_empty());
    assert_eq!(store.active_subscriptions(), 0);
}

#[test]
fn reads_fail_after_destroy() {
    let model = Model::new(store());
    model.destroy();
    assert_eq!(
        model.get_property("/Orders(o1)/total", None),
        Err(BindingError::ModelDestroyed)
    );
}

#[test]
fn config_loads_from_json() {
    let config: ModelConfig =
        serde_json::from_str(r#"{"sizeLimit": 1, "legacySyntax": true}"#).unwrap();
    let model = Model::with_config(store(), config);
    assert_eq!(model.size_limit(), 1);

    let orders = model.bind_list("Orders", None, vec![], vec![]).unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(
        model.get_property("Orders(o2)/total", None).unwrap(),
        Some(json!(15))
    );
}

#[test]
fn zero_size_limit_uses_the_default() {
    let config: ModelConfig = serde_json::from_str(r#"{"sizeLimit": 0}"#).unwrap();
    let model = Model::with_config(store(), config);
    assert_eq!(model.size_limit(), docbind::DEFAULT_SIZE_LIMIT);
}

#[test]
fn run_query_exposes_the_compiled_selector() {
    let model = Model::new(store());
    let cursor = model
        .run_query("/Orders(o2)/items", None, &[], &[])
        .unwrap();
    assert_eq!(cursor.collection_name(), "Orders");
    let documents = cursor.fetch().unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0]["_id"], json!("o2"));
}
