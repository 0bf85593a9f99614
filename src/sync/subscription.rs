use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::query::QuerySpec;
use crate::store::{ChangeEvent, ChangeFeed};

pub(crate) struct SubscriptionInner {
    collection: String,
    query: QuerySpec,
    feed: Mutex<Box<dyn ChangeFeed>>,
}

impl SubscriptionInner {
    fn feed(&self) -> std::sync::MutexGuard<'_, Box<dyn ChangeFeed>> {
        self.feed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn stop(&self) {
        self.feed().stop();
    }
}

/// A live handle to one query's change feed.
///
/// Clones share the same feed. Stopping is synchronous: once `stop` returns,
/// `poll` yields nothing for this subscription.
#[derive(Clone)]
pub struct Subscription {
    inner: Arc<SubscriptionInner>,
}

impl Subscription {
    pub fn new(collection: impl Into<String>, query: QuerySpec, feed: Box<dyn ChangeFeed>) -> Self {
        Self {
            inner: Arc::new(SubscriptionInner {
                collection: collection.into(),
                query,
                feed: Mutex::new(feed),
            }),
        }
    }

    pub fn collection(&self) -> &str {
        &self.inner.collection
    }

    pub fn query(&self) -> &QuerySpec {
        &self.inner.query
    }

    pub fn poll(&self) -> Option<ChangeEvent> {
        self.inner.feed().poll()
    }

    pub fn stop(&self) {
        self.inner.stop();
    }

    pub fn is_active(&self) -> bool {
        !self.inner.feed().is_stopped()
    }

    pub(crate) fn downgrade(&self) -> Weak<SubscriptionInner> {
        Arc::downgrade(&self.inner)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("collection", &self.inner.collection)
            .field("query", &self.inner.query)
            .field("active", &self.is_active())
            .finish()
    }
}
