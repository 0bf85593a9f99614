//! Forward binding events onto an [`event_emitter_rs::EventEmitter`].
//!
//! Each event is published under its name (`dataReceived`, `change`,
//! `parseError`, `requestFailed`) with its JSON form as the payload. The
//! emitter runs listeners on their own threads.
//!
//! ```ignore
//! use docbind::emitter::EmitterBridge;
//!
//! let bridge = EmitterBridge::new();
//! bridge.on("change", |payload: String| println!("{}", payload));
//! bridge.attach(binding.events());
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use event_emitter_rs::EventEmitter;

use crate::events::{BindingEvent, EventHub, ListenerId};

#[derive(Clone)]
pub struct EmitterBridge {
    emitter: Arc<Mutex<EventEmitter>>,
}

impl Default for EmitterBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl EmitterBridge {
    pub fn new() -> Self {
        Self::with_emitter(EventEmitter::new())
    }

    pub fn with_emitter(emitter: EventEmitter) -> Self {
        Self {
            emitter: Arc::new(Mutex::new(emitter)),
        }
    }

    /// Register a listener for one event name.
    pub fn on<F>(&self, event: &str, listener: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.emitter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .on(event, listener);
    }

    /// Publish one event immediately.
    pub fn publish(&self, event: &BindingEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(error) => {
                tracing::warn!(event = event.name(), error = %error, "event not serializable");
                return;
            }
        };
        self.emitter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .emit(event.name(), payload);
    }

    /// Forward every event raised on `hub`.
    pub fn attach(&self, hub: &EventHub<BindingEvent>) -> ListenerId {
        let bridge = self.clone();
        hub.on(move |event| bridge.publish(event))
    }
}
