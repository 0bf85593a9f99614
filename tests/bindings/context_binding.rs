use std::sync::Arc;

use docbind::{Binding, BindingEvent, ChangeReason};
use serde_json::json;

use crate::support::{model, record};

#[test]
fn element_context_is_canonical() {
    let (store, model) = model();
    let header = model.bind_context("/Orders(o1)", None).unwrap();

    let canonical = model.get_context("/Orders(o1)").unwrap();
    assert!(Arc::ptr_eq(header.element_context(), &canonical));
    assert!(header.context().is_none());
    assert_eq!(store.active_subscriptions(), 1);
}

#[test]
fn document_updates_and_removal_raise_events() {
    let (store, model) = model();
    let mut header = model.bind_context("/Orders(o1)", None).unwrap();
    let log = record(&header);

    store
        .update("Orders", &"o1".into(), json!({"total": 41}))
        .unwrap();
    assert_eq!(header.process_changes(), 1);
    assert_eq!(log.take(), vec![BindingEvent::Change(ChangeReason::Change)]);

    // Changes to other documents are not observed.
    store
        .update("Orders", &"o2".into(), json!({"total": 16}))
        .unwrap();
    assert_eq!(header.process_changes(), 0);

    store.remove("Orders", &"o1".into()).unwrap();
    header.process_changes();
    assert_eq!(log.take(), vec![BindingEvent::Change(ChangeReason::Remove)]);
}

#[test]
fn set_context_rebinds_the_relative_path() {
    let (store, model) = model();
    let first = model.get_context("/Orders(o1)").unwrap();
    let second = model.get_context("/Orders(o2)").unwrap();
    let mut items = model.bind_context("items", Some(first.clone())).unwrap();
    assert_eq!(items.element_context().path(), "/Orders(o1)/items");
    let log = record(&items);

    items.set_context(Some(first));
    assert!(log.events().is_empty());

    items.set_context(Some(second.clone()));
    assert_eq!(items.element_context().path(), "/Orders(o2)/items");
    assert!(Arc::ptr_eq(items.context().unwrap(), &second));
    assert_eq!(
        log.events().last(),
        Some(&BindingEvent::Change(ChangeReason::Change))
    );
    assert_eq!(store.stopped_subscriptions(), 1);
    assert_eq!(store.active_subscriptions(), 1);
}

#[test]
fn refresh_only_fires_when_forced_or_changed() {
    let (_store, model) = model();
    let mut header = model.bind_context("/Orders(o1)", None).unwrap();
    let log = record(&header);

    header.refresh(false);
    assert!(log.events().is_empty());

    header.refresh(true);
    header.initialize();
    assert_eq!(
        log.events(),
        vec![
            BindingEvent::Change(ChangeReason::Change),
            BindingEvent::Change(ChangeReason::Change)
        ]
    );
}

#[test]
fn destroy_stops_observing() {
    let (store, model) = model();
    let mut header = model.bind_context("/Orders(o1)", None).unwrap();
    header.destroy();
    assert!(header.is_destroyed());
    assert_eq!(store.active_subscriptions(), 0);

    store
        .update("Orders", &"o1".into(), json!({"total": 1}))
        .unwrap();
    assert_eq!(header.process_changes(), 0);
}
