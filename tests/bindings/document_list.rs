use docbind::{
    Binding, BindingError, BindingEvent, ChangeReason, EventLog, FilterOperator, FilterSpec,
    ListBinding, ListBindingOps, Model, ModelConfig, ModelEvent, SortSpec,
};
use serde_json::json;

use crate::support::{model, paths, record, seeded_store};

fn is_add(event: &BindingEvent) -> bool {
    *event == BindingEvent::Change(ChangeReason::Add)
}

#[test]
fn lists_documents_in_store_order() {
    let (_store, model) = model();
    let mut orders = model.bind_list("/Orders", None, vec![], vec![]).unwrap();

    assert!(matches!(orders, ListBinding::Documents(_)));
    assert_eq!(
        paths(&orders.get_contexts(None, None)),
        vec!["/Orders(o1)", "/Orders(o2)", "/Orders(o3)"]
    );
    assert_eq!(orders.len(), 3);
    assert!(!orders.is_length_final());
    assert_eq!(orders.current_contexts().len(), 3);
}

#[test]
fn sorts_and_filters() {
    let (_store, model) = model();
    let mut orders = model
        .bind_list("/Orders", None, vec![SortSpec::descending("total")], vec![])
        .unwrap();
    assert_eq!(
        paths(&orders.current_contexts()),
        vec!["/Orders(o3)", "/Orders(o1)", "/Orders(o2)"]
    );

    orders.filter(vec![FilterSpec::new("status", FilterOperator::EQ, json!("open"))]);
    assert_eq!(
        paths(&orders.current_contexts()),
        vec!["/Orders(o3)", "/Orders(o1)"]
    );

    orders.sort(vec![SortSpec::ascending("total")]);
    assert_eq!(
        paths(&orders.current_contexts()),
        vec!["/Orders(o1)", "/Orders(o3)"]
    );
}

#[test]
fn range_and_pattern_filters() {
    let (_store, model) = model();
    let orders = model
        .bind_list(
            "/Orders",
            None,
            vec![],
            vec![FilterSpec::between("total", json!(10), json!(50))],
        )
        .unwrap();
    assert_eq!(
        paths(&orders.current_contexts()),
        vec!["/Orders(o1)", "/Orders(o2)"]
    );

    let customers = model
        .bind_list(
            "/Customers",
            None,
            vec![],
            vec![FilterSpec::new("name", FilterOperator::StartsWith, json!("glo"))],
        )
        .unwrap();
    assert_eq!(
        paths(&customers.current_contexts()),
        vec![r#"/Customers(ObjectID("5f2a"))"#]
    );
}

#[test]
fn pages_through_contexts() {
    let (_store, model) = model();
    let mut orders = model.bind_list("/Orders", None, vec![], vec![]).unwrap();

    assert_eq!(
        paths(&orders.get_contexts(Some(1), Some(1))),
        vec!["/Orders(o2)"]
    );
    assert_eq!(
        paths(&orders.get_contexts(Some(1), None)),
        vec!["/Orders(o2)", "/Orders(o3)"]
    );
    assert!(orders.get_contexts(Some(5), None).is_empty());
}

#[test]
fn size_limit_caps_the_query() {
    let store = seeded_store();
    let model = Model::with_config(store, ModelConfig::new().with_size_limit(2));
    let mut orders = model.bind_list("/Orders", None, vec![], vec![]).unwrap();

    assert_eq!(orders.len(), 2);
    assert_eq!(orders.get_contexts(Some(1), None).len(), 1);
}

#[test]
fn inserts_honour_store_position() {
    let (store, model) = model();
    let mut orders = model
        .bind_list("/Orders", None, vec![SortSpec::ascending("total")], vec![])
        .unwrap();
    let log = record(&orders);

    store
        .insert("Orders", json!({"_id": "o4", "total": 20, "status": "open"}))
        .unwrap();
    assert_eq!(orders.process_changes(), 2);

    assert_eq!(
        log.events(),
        vec![BindingEvent::DataReceived, BindingEvent::Change(ChangeReason::Add)]
    );
    assert_eq!(
        paths(&orders.current_contexts()),
        vec!["/Orders(o2)", "/Orders(o4)", "/Orders(o1)", "/Orders(o3)"]
    );
}

#[test]
fn changes_and_removals_refresh_the_model() {
    let (store, model) = model();
    let mut orders = model.bind_list("/Orders", None, vec![], vec![]).unwrap();
    let log = record(&orders);
    let model_log = EventLog::attach(model.events());

    store
        .update("Orders", &"o1".into(), json!({"status": "shipped"}))
        .unwrap();
    orders.process_changes();
    assert_eq!(log.take(), vec![BindingEvent::Change(ChangeReason::Refresh)]);
    assert_eq!(orders.len(), 3);

    store.remove("Orders", &"o2".into()).unwrap();
    orders.process_changes();
    assert_eq!(log.take(), vec![BindingEvent::Change(ChangeReason::Refresh)]);
    assert_eq!(
        paths(&orders.current_contexts()),
        vec!["/Orders(o1)", "/Orders(o3)"]
    );
    assert_eq!(model_log.events(), vec![ModelEvent::Refresh, ModelEvent::Refresh]);
}

#[test]
fn documents_leaving_the_filter_are_removed() {
    let (store, model) = model();
    let mut orders = model
        .bind_list(
            "/Orders",
            None,
            vec![],
            vec![FilterSpec::new("status", FilterOperator::EQ, json!("open"))],
        )
        .unwrap();
    assert_eq!(orders.len(), 2);

    store
        .update("Orders", &"o3".into(), json!({"status": "shipped"}))
        .unwrap();
    orders.process_changes();
    assert_eq!(paths(&orders.current_contexts()), vec!["/Orders(o1)"]);
}

#[test]
fn refiltering_keeps_one_live_subscription() {
    let (store, model) = model();
    let mut orders = model.bind_list("/Orders", None, vec![], vec![]).unwrap();
    let log = record(&orders);

    orders.filter(vec![FilterSpec::new("status", FilterOperator::EQ, json!("open"))]);
    orders.filter(vec![FilterSpec::new("total", FilterOperator::GT, json!(50))]);

    assert_eq!(store.stopped_subscriptions(), 2);
    assert_eq!(store.active_subscriptions(), 1);
    assert_eq!(paths(&orders.current_contexts()), vec!["/Orders(o3)"]);

    let events = log.events();
    assert_eq!(events[0], BindingEvent::Change(ChangeReason::Remove));
    assert_eq!(events.iter().filter(|e| is_add(e)).count(), 3);
}

#[test]
fn unsupported_operator_is_skipped_with_one_parse_error() {
    let (_store, model) = model();
    let mut orders = model.bind_list("/Orders", None, vec![], vec![]).unwrap();
    let log = record(&orders);

    orders.filter(vec![
        FilterSpec::new("x", FilterOperator::Other("BOGUS".into()), json!(1)),
        FilterSpec::new("status", FilterOperator::EQ, json!("shipped")),
    ]);

    let parse_errors: Vec<_> = log
        .events()
        .into_iter()
        .filter(|e| matches!(e, BindingEvent::ParseError(_)))
        .collect();
    assert_eq!(
        parse_errors,
        vec![BindingEvent::ParseError("filter operator BOGUS not supported".into())]
    );
    assert_eq!(paths(&orders.current_contexts()), vec!["/Orders(o2)"]);
}

#[test]
fn unsupported_sorters_are_skipped() {
    let (_store, model) = model();
    let mut orders = model.bind_list("/Orders", None, vec![], vec![]).unwrap();
    let log = record(&orders);

    orders.sort(vec![
        SortSpec::ascending("customer/name"),
        SortSpec::descending("total").with_comparator(|a, b| a.to_string().cmp(&b.to_string())),
    ]);

    let parse_errors = log
        .events()
        .into_iter()
        .filter(|e| matches!(e, BindingEvent::ParseError(_)))
        .count();
    assert_eq!(parse_errors, 2);
    assert_eq!(orders.len(), 3);
}

#[test]
fn destroy_releases_the_subscription() {
    let (store, model) = model();
    let mut orders = model.bind_list("/Orders", None, vec![], vec![]).unwrap();

    orders.destroy();
    orders.destroy();
    assert!(orders.is_destroyed());
    assert_eq!(store.active_subscriptions(), 0);
    assert_eq!(store.stopped_subscriptions(), 1);

    store
        .insert("Orders", json!({"_id": "o4", "total": 1}))
        .unwrap();
    assert_eq!(orders.process_changes(), 0);
    assert!(orders.current_contexts().is_empty());
}

#[test]
fn dropping_a_binding_ends_its_live_query() {
    let (store, model) = model();
    let orders = model.bind_list("/Orders", None, vec![], vec![]).unwrap();
    assert_eq!(store.active_subscriptions(), 1);
    drop(orders);
    assert_eq!(store.active_subscriptions(), 0);
}

#[test]
fn unknown_collection_leaves_an_inert_binding() {
    let (store, model) = model();
    let model_log = EventLog::attach(model.events());
    let mut missing = model.bind_list("/Nope", None, vec![], vec![]).unwrap();

    assert!(missing.get_contexts(None, None).is_empty());
    assert_eq!(store.active_subscriptions(), 0);
    assert_eq!(
        model_log.events(),
        vec![ModelEvent::ParseError("unknown collection `Nope`".into())]
    );
}

#[test]
fn relative_path_without_context_is_a_syntax_error() {
    let (_store, model) = model();
    let result = model.bind_list("Orders", None, vec![], vec![]);
    assert!(matches!(result, Err(BindingError::PathSyntax { .. })));

    let legacy = Model::with_config(seeded_store(), ModelConfig::new().with_legacy_syntax(true));
    let orders = legacy.bind_list("Orders", None, vec![], vec![]).unwrap();
    assert_eq!(orders.len(), 3);
}
