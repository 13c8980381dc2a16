//! Store Event Bus
//!
//! Asynchronous pub/sub of store mutations. Owned by the registry and handed
//! to each store, so nothing here is process-global.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::entities::EntityKind;

/// Default number of events buffered per subscriber
pub const DEFAULT_CAPACITY: usize = 1024;

/// Something that happened to a store's collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum StoreEvent {
    /// The cached collection was replaced by a full fetch
    Fetched { kind: EntityKind, count: usize },
    /// The backend accepted a new record
    Added { kind: EntityKind },
    /// The backend accepted an update
    Updated { kind: EntityKind, id: String },
    /// A record was removed (or soft-deleted) by the backend
    Deleted { kind: EntityKind, id: String },
    /// A soft-deleted record was reactivated
    Reactivated { kind: EntityKind, id: String },
    /// Every worker of a crew was unassigned from it
    MembersReleased { crew_id: String },
    /// A store operation failed and its error field was set
    Failed { kind: EntityKind, message: String },
}

impl StoreEvent {
    pub fn kind(&self) -> EntityKind {
        match self {
            StoreEvent::Fetched { kind, .. }
            | StoreEvent::Added { kind }
            | StoreEvent::Updated { kind, .. }
            | StoreEvent::Deleted { kind, .. }
            | StoreEvent::Reactivated { kind, .. }
            | StoreEvent::Failed { kind, .. } => *kind,
            StoreEvent::MembersReleased { .. } => EntityKind::Crew,
        }
    }

    /// True for events that mean the backend's rows changed
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            StoreEvent::Added { .. }
                | StoreEvent::Updated { .. }
                | StoreEvent::Deleted { .. }
                | StoreEvent::Reactivated { .. }
                | StoreEvent::MembersReleased { .. }
        )
    }

    /// True for events that may change which crew a worker belongs to
    pub fn touches_workers(&self) -> bool {
        match self {
            StoreEvent::MembersReleased { .. } => true,
            other => other.kind() == EntityKind::Worker && other.is_mutation(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<StoreEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: StoreEvent) {
        // No subscribers is not an error.
        let _ = self.tx.send(event);
    }

    /// Create a new subscriber
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
