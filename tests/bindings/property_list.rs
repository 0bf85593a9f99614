use std::sync::Arc;

use docbind::{
    Binding, BindingEvent, ChangeReason, FilterOperator, FilterSpec, ListBinding, ListBindingOps,
    SortSpec,
};
use serde_json::json;

use crate::support::{model, paths, record};

#[test]
fn parent_context_selects_property_list() {
    let (_store, model) = model();
    let order = model.get_context("/Orders(o1)").unwrap();
    let mut items = model
        .bind_list("items", Some(order.clone()), vec![], vec![])
        .unwrap();

    assert!(matches!(items, ListBinding::Property(_)));
    assert_eq!(
        items.as_property().map(|b| b.resolved_path()),
        Some("/Orders(o1)/items")
    );
    assert_eq!(
        paths(&items.get_contexts(None, None)),
        vec![
            "/Orders(o1)/items[0]",
            "/Orders(o1)/items[1]",
            "/Orders(o1)/items[2]"
        ]
    );
    assert_eq!(items.len(), 3);
    assert!(Arc::ptr_eq(items.context().unwrap(), &order));
}

#[test]
fn element_contexts_are_canonical_and_paged() {
    let (_store, model) = model();
    let order = model.get_context("/Orders(o1)").unwrap();
    let mut items = model.bind_list("items", Some(order), vec![], vec![]).unwrap();

    let page = items.get_contexts(Some(1), Some(1));
    assert_eq!(paths(&page), vec!["/Orders(o1)/items[1]"]);
    let cached = model.get_context("/Orders(o1)/items[1]").unwrap();
    assert!(Arc::ptr_eq(&page[0], &cached));

    // Materialized on every call, the full list is kept as current.
    assert_eq!(items.current_contexts().len(), 3);
}

#[test]
fn element_values_resolve_through_contexts() {
    let (_store, model) = model();
    let order = model.get_context("/Orders(o2)").unwrap();
    let mut items = model.bind_list("items", Some(order), vec![], vec![]).unwrap();
    let first = items.get_contexts(None, None).remove(0);
    assert_eq!(model.get_property("", Some(&first)).unwrap(), Some(json!("d")));
}

#[test]
fn sorters_at_construction_leave_binding_inert() {
    let (store, model) = model();
    let order = model.get_context("/Orders(o1)").unwrap();
    let mut items = model
        .bind_list("items", Some(order), vec![SortSpec::ascending("name")], vec![])
        .unwrap();

    assert!(items.as_property().unwrap().is_inert());
    assert!(items.get_contexts(None, None).is_empty());
    assert_eq!(store.active_subscriptions(), 0);
}

#[test]
fn filter_and_sort_calls_fail_the_request() {
    let (_store, model) = model();
    let order = model.get_context("/Orders(o1)").unwrap();
    let mut items = model.bind_list("items", Some(order), vec![], vec![]).unwrap();
    let log = record(&items);

    items
        .filter(vec![FilterSpec::new("x", FilterOperator::EQ, json!(1))])
        .sort(vec![SortSpec::descending("x")]);

    let failure =
        BindingEvent::RequestFailed("sorting and filtering not supported for binding to arrays".into());
    assert_eq!(log.events(), vec![failure.clone(), failure]);
    assert_eq!(items.get_contexts(None, None).len(), 3);
}

#[test]
fn non_array_property_reports_shape_error() {
    let (_store, model) = model();
    let order = model.get_context("/Orders(o1)").unwrap();
    let mut status = model.bind_list("status", Some(order), vec![], vec![]).unwrap();
    let log = record(&status);

    assert!(status.get_contexts(None, None).is_empty());
    assert_eq!(
        log.events(),
        vec![BindingEvent::ParseError("/Orders(o1)/status is not an array".into())]
    );
}

#[test]
fn missing_document_yields_nothing() {
    let (_store, model) = model();
    let order = model.get_context("/Orders(o9)").unwrap();
    let mut items = model.bind_list("items", Some(order), vec![], vec![]).unwrap();
    let log = record(&items);

    assert!(items.get_contexts(None, None).is_empty());
    assert!(log.events().is_empty());
}

#[test]
fn document_changes_refresh_and_rematerialize() {
    let (store, model) = model();
    let order = model.get_context("/Orders(o1)").unwrap();
    let mut items = model.bind_list("items", Some(order), vec![], vec![]).unwrap();
    assert_eq!(items.get_contexts(None, None).len(), 3);
    let log = record(&items);

    store
        .update("Orders", &"o1".into(), json!({"items": ["a", "b", "c", "d"]}))
        .unwrap();
    items.process_changes();

    assert_eq!(log.events(), vec![BindingEvent::Change(ChangeReason::Refresh)]);
    assert_eq!(items.get_contexts(None, None).len(), 4);
}
