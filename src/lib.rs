pub mod binding;
mod context;
#[cfg(feature = "emitter")]
pub mod emitter;
mod error;
pub mod events;
mod model;
pub mod path;
pub mod query;
mod store;
pub mod sync;

pub use binding::{
    Binding, ContextBinding, DocumentListBinding, ListBinding, ListBindingOps, PropertyBinding,
    PropertyListBinding,
};
pub use context::{BindingContext, ContextCache, ContextSource};
pub use error::{BindingError, StoreError};
pub use events::{BindingEvent, ChangeReason, EventHub, EventLog, ListenerId, ModelEvent};
pub use model::{Model, ModelConfig, DEFAULT_SIZE_LIMIT};
pub use path::{DocumentId, PathComponents};
pub use query::{FilterOperator, FilterSpec, QuerySpec, SortSpec, SortSpecifier};
pub use store::{
    ChangeEvent, ChangeFeed, Collection, Cursor, DocumentStore, InMemoryChangeFeed,
    InMemoryDocumentStore,
};
pub use sync::{ChangeSynchronizer, Notification, Subscription, SyncMode, SyncState};

// Re-export the EventEmitter from the event_emitter_rs crate
#[cfg(feature = "emitter")]
pub use event_emitter_rs::EventEmitter;
