//! ChangeSynchronizer - keeps a binding's view in step with a live query.
//!
//! The synchronizer is a reducer: it takes [`ChangeEvent`]s from the store
//! and turns them into an updated ordered set of contexts plus the
//! [`Notification`]s the owning binding should raise. It never emits events
//! itself, so it can be driven with a synthetic event sequence.
//!
//! ```text
//! Idle ──begin_query──▶ Querying ──attach──▶ Subscribed
//!   ▲                                           │
//!   └────────────── begin_query (stop) ◀────────┘
//!                        destroy ──▶ Destroyed
//! ```

mod subscription;

use std::sync::Arc;

use crate::context::{BindingContext, ContextSource};
use crate::events::ChangeReason;
use crate::path::DocumentId;
use crate::store::ChangeEvent;

pub(crate) use subscription::SubscriptionInner;
pub use subscription::Subscription;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Querying,
    Subscribed,
    Destroyed,
}

/// What the synchronized query feeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncMode {
    /// An ordered list of document contexts under `collection_path`
    /// (e.g. `/Orders`).
    DocumentList { collection_path: String },
    /// A list over an array property; the query tracks the owning document.
    PropertyList,
    /// One document.
    Single,
}

/// What the owning binding should do in response to a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    DataReceived,
    Change(ChangeReason),
    /// Dependent data is stale; the model should refresh.
    RefreshRequested,
}

pub struct ChangeSynchronizer {
    mode: SyncMode,
    state: SyncState,
    contexts: Vec<Arc<BindingContext>>,
    subscription: Option<Subscription>,
}

impl ChangeSynchronizer {
    pub fn new(mode: SyncMode) -> Self {
        Self {
            mode,
            state: SyncState::Idle,
            contexts: Vec::new(),
            subscription: None,
        }
    }

    pub fn mode(&self) -> &SyncMode {
        &self.mode
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// The ordered result set. Empty outside document-list mode.
    pub fn contexts(&self) -> &[Arc<BindingContext>] {
        &self.contexts
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn subscription(&self) -> Option<&Subscription> {
        self.subscription.as_ref()
    }

    /// Stop the current subscription, if any, and reset the result set.
    ///
    /// Safe to call repeatedly. Yields the `Change(Remove)` that stands for
    /// the reset.
    pub fn begin_query(&mut self) -> Vec<Notification> {
        if self.state == SyncState::Destroyed {
            return Vec::new();
        }
        self.stop_subscription();
        self.contexts.clear();
        self.state = SyncState::Querying;
        vec![Notification::Change(ChangeReason::Remove)]
    }

    /// Attach the feed of a freshly issued query.
    pub fn attach(&mut self, subscription: Subscription) {
        if self.state == SyncState::Destroyed {
            subscription.stop();
            return;
        }
        self.stop_subscription();
        tracing::trace!(collection = subscription.collection(), "subscribed");
        self.subscription = Some(subscription);
        self.state = SyncState::Subscribed;
    }

    /// The query could not be issued; no feed will be attached.
    pub fn abandon_query(&mut self) {
        if self.state == SyncState::Querying {
            self.state = SyncState::Idle;
        }
    }

    /// Apply one store event and return the notifications it produces.
    pub fn apply(&mut self, event: ChangeEvent, contexts: &dyn ContextSource) -> Vec<Notification> {
        if self.state == SyncState::Destroyed {
            return Vec::new();
        }

        match (&self.mode, event) {
            (SyncMode::DocumentList { collection_path }, ChangeEvent::Added { id, before, .. }) => {
                let context = contexts.context_for(&document_path(collection_path, &id));
                let index = before.and_then(|before| {
                    let before_path = document_path(collection_path, &before);
                    self.contexts.iter().position(|c| c.path() == before_path)
                });
                match index {
                    Some(index) => self.contexts.insert(index, context),
                    None => self.contexts.push(context),
                }
                vec![
                    Notification::DataReceived,
                    Notification::Change(ChangeReason::Add),
                ]
            }
            (SyncMode::DocumentList { collection_path }, ChangeEvent::Removed { id }) => {
                let path = document_path(collection_path, &id);
                match self.contexts.iter().position(|c| c.path() == path) {
                    Some(index) => {
                        self.contexts.remove(index);
                    }
                    None => tracing::debug!(%path, "removed document not in result set"),
                }
                vec![Notification::RefreshRequested]
            }
            (SyncMode::DocumentList { .. } | SyncMode::PropertyList, ChangeEvent::Changed { .. })
            | (SyncMode::PropertyList, ChangeEvent::Removed { .. }) => {
                vec![Notification::RefreshRequested]
            }
            (SyncMode::PropertyList | SyncMode::Single, ChangeEvent::Added { .. }) => vec![
                Notification::DataReceived,
                Notification::Change(ChangeReason::Add),
            ],
            (SyncMode::Single, ChangeEvent::Changed { .. }) => {
                vec![Notification::Change(ChangeReason::Change)]
            }
            (SyncMode::Single, ChangeEvent::Removed { .. }) => {
                vec![Notification::Change(ChangeReason::Remove)]
            }
        }
    }

    /// Drain every pending event of the attached subscription.
    pub fn pump(&mut self, contexts: &dyn ContextSource) -> Vec<Notification> {
        let mut notifications = Vec::new();
        while let Some(event) = self.subscription.as_ref().and_then(Subscription::poll) {
            notifications.extend(self.apply(event, contexts));
        }
        notifications
    }

    /// Stop the subscription and refuse further events. Idempotent.
    pub fn destroy(&mut self) {
        if self.state == SyncState::Destroyed {
            return;
        }
        self.stop_subscription();
        self.contexts.clear();
        self.state = SyncState::Destroyed;
    }

    fn stop_subscription(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.stop();
            tracing::trace!(collection = subscription.collection(), "subscription stopped");
        }
        if self.state == SyncState::Subscribed {
            self.state = SyncState::Idle;
        }
    }
}

/// Absolute path of one document under a collection path.
pub(crate) fn document_path(collection_path: &str, id: &DocumentId) -> String {
    format!("{}({})", collection_path, id)
}
