use docbind::{Binding, BindingError, BindingEvent, ChangeReason};
use serde_json::json;

use crate::support::{model, record};

#[test]
fn reads_absolute_and_relative_paths() {
    let (_store, model) = model();
    let total = model.bind_property("/Orders(o1)/total", None).unwrap();
    assert_eq!(total.get_value(), Some(json!(40)));

    let order = model.get_context("/Orders(o3)").unwrap();
    let status = model.bind_property("status", Some(order)).unwrap();
    assert_eq!(status.get_value(), Some(json!("open")));

    let whole = model.bind_property("/Orders(o2)", None).unwrap();
    assert_eq!(whole.get_value().unwrap()["total"], json!(15));
}

#[test]
fn lookups_follow_foreign_keys() {
    let (_store, model) = model();
    let first = model.get_context("/Orders(o1)").unwrap();
    let second = model.get_context("/Orders(o2)").unwrap();

    let name = model
        .bind_property("?Customers(customerId)/name", Some(first))
        .unwrap();
    assert_eq!(name.get_value(), Some(json!("Acme")));

    let name = model
        .bind_property("?Customers(customerId)/name", Some(second))
        .unwrap();
    assert_eq!(name.get_value(), Some(json!("Globex")));
}

#[test]
fn unresolvable_paths_read_nothing() {
    let (_store, model) = model();
    assert_eq!(
        model.bind_property("status", None).unwrap().get_value(),
        None
    );
    assert_eq!(
        model
            .bind_property("/Orders(o9)/status", None)
            .unwrap()
            .get_value(),
        None
    );
    assert_eq!(
        model
            .bind_property("?Customers(customerId)/name", None)
            .unwrap()
            .get_value(),
        None
    );
}

#[test]
fn malformed_path_is_rejected() {
    let (_store, model) = model();
    let order = model.get_context("/Orders(o1)").unwrap();
    let result = model.bind_property("/Orders(o1/total", Some(order));
    assert!(matches!(result, Err(BindingError::PathSyntax { .. })));
}

#[test]
fn check_update_reports_store_changes() {
    let (store, model) = model();
    let mut total = model.bind_property("/Orders(o1)/total", None).unwrap();
    let log = record(&total);

    assert!(!total.check_update(false));
    store
        .update("Orders", &"o1".into(), json!({"total": 55}))
        .unwrap();
    assert_eq!(total.process_changes(), 1);
    assert_eq!(total.get_value(), Some(json!(55)));
    assert!(total.check_update(true));

    assert_eq!(
        log.events(),
        vec![
            BindingEvent::Change(ChangeReason::Change),
            BindingEvent::Change(ChangeReason::Change)
        ]
    );
}

#[test]
fn set_context_reads_the_new_document() {
    let (_store, model) = model();
    let first = model.get_context("/Orders(o1)").unwrap();
    let second = model.get_context("/Orders(o2)").unwrap();
    let mut status = model.bind_property("status", Some(first.clone())).unwrap();
    let log = record(&status);

    status.set_context(Some(first));
    assert!(log.events().is_empty());

    status.set_context(Some(second));
    assert_eq!(status.get_value(), Some(json!("shipped")));
    assert_eq!(log.events(), vec![BindingEvent::Change(ChangeReason::Change)]);
}

#[test]
fn destroyed_binding_stays_quiet() {
    let (store, model) = model();
    let mut total = model.bind_property("/Orders(o1)/total", None).unwrap();
    let log = record(&total);
    total.destroy();
    assert!(total.is_destroyed());

    store
        .update("Orders", &"o1".into(), json!({"total": 1}))
        .unwrap();
    total.refresh(true);
    assert!(log.events().is_empty());
}
