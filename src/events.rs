//! Events raised by bindings and models, and the hub listeners attach to.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;

/// Why a binding's data changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeReason {
    Add,
    Remove,
    Change,
    /// Model-wide refresh; dependent data must be re-read.
    Refresh,
}

/// Events a binding raises towards its consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum BindingEvent {
    DataReceived,
    Change(ChangeReason),
    ParseError(String),
    RequestFailed(String),
}

impl BindingEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BindingEvent::DataReceived => "dataReceived",
            BindingEvent::Change(_) => "change",
            BindingEvent::ParseError(_) => "parseError",
            BindingEvent::RequestFailed(_) => "requestFailed",
        }
    }
}

/// Events a model raises towards its consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum ModelEvent {
    ParseError(String),
    Refresh,
    Destroyed,
}

pub type ListenerId = u64;

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Synchronous listener registry.
///
/// Listeners run on the emitting thread, in registration order. The list is
/// snapshotted before dispatch, so a listener may register or remove
/// listeners (or trigger further events) without deadlocking.
pub struct EventHub<E> {
    listeners: RwLock<Vec<(ListenerId, Listener<E>)>>,
    next_id: AtomicU64,
}

impl<E> Default for EventHub<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventHub<E> {
    pub fn new() -> Self {
        EventHub {
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn on<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Listener<E>> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in snapshot {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Collects every event it sees. Handy for asserting on event sequences.
#[derive(Clone)]
pub struct EventLog<E> {
    events: Arc<std::sync::Mutex<Vec<E>>>,
}

impl<E: Clone + Send + 'static> EventLog<E> {
    pub fn new() -> Self {
        Self {
            events: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    /// Attach to a hub and start recording.
    pub fn attach(hub: &EventHub<E>) -> Self {
        let log = Self::new();
        let sink = Arc::clone(&log.events);
        hub.on(move |event: &E| {
            sink.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.clone())
        });
        log
    }

    pub fn events(&self) -> Vec<E> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn take(&self) -> Vec<E> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl<E: Clone + Send + 'static> Default for EventLog<E> {
    fn default() -> Self {
        Self::new()
    }
}
