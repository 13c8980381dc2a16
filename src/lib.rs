//! Harvest Sync
//!
//! Client-side state synchronisation for seasonal agricultural-labor
//! operations:
//! - Per-entity stores kept consistent with a remote command backend
//! - Optimistic or conservative delete, chosen per store
//! - A crew-to-workers index cache with explicit refresh
//! - Connectivity status driven by platform events

pub mod config;
pub mod connectivity;
pub mod entities;
pub mod error;
pub mod events;
pub mod gateway;
pub mod index;
pub mod registry;
pub mod store;
pub mod telemetry;

// Re-exports for convenience
pub use config::SyncConfig;
pub use connectivity::{ConnectivityMonitor, NetworkEvent};
pub use entities::{Entity, EntityKind, RecordId};
pub use error::{StoreError, StoreResult};
pub use events::{EventBus, StoreEvent};
pub use gateway::{GatewayCall, GatewayError, InMemoryBackend, Receipt, RemoteGateway};
pub use index::{IndexInvalidation, WorkersByCrew};
pub use registry::StoreRegistry;
pub use store::{DeletePolicy, EntityStore, StoreState};
