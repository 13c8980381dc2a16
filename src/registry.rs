//! Store Registry
//!
//! Built once at startup and passed by reference to consumers. Owns one store
//! per entity type, the crew index, the connectivity monitor and the event
//! bus they publish on.

use std::sync::Arc;
use tracing::info;

use crate::config::SyncConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::entities::{Client, Crew, Entity, GrapeType, PackagingType, Production, Season, Variety, Worker};
use crate::error::StoreResult;
use crate::events::EventBus;
use crate::gateway::RemoteGateway;
use crate::index::WorkersByCrew;
use crate::store::EntityStore;

pub struct StoreRegistry {
    pub clients: EntityStore<Client>,
    pub crews: EntityStore<Crew>,
    pub workers: EntityStore<Worker>,
    pub productions: EntityStore<Production>,
    pub seasons: EntityStore<Season>,
    pub grape_types: EntityStore<GrapeType>,
    pub packaging_types: EntityStore<PackagingType>,
    pub varieties: EntityStore<Variety>,
    pub crew_index: WorkersByCrew,
    pub connectivity: ConnectivityMonitor,
    events: EventBus,
}

impl StoreRegistry {
    pub fn new(gateway: Arc<dyn RemoteGateway>, config: &SyncConfig) -> Self {
        let events = EventBus::new(config.event_capacity);

        let registry = Self {
            clients: store(&gateway, &events, config),
            crews: store(&gateway, &events, config),
            workers: store(&gateway, &events, config),
            productions: store(&gateway, &events, config),
            seasons: store(&gateway, &events, config),
            grape_types: store(&gateway, &events, config),
            packaging_types: store(&gateway, &events, config),
            varieties: store(&gateway, &events, config),
            crew_index: WorkersByCrew::with_invalidation(Arc::clone(&gateway), config.crew_index, &events),
            connectivity: ConnectivityMonitor::new(config.initially_online),
            events,
        };

        info!(
            crew_index = ?registry.crew_index.mode(),
            conservative = ?config.conservative_delete,
            online = config.initially_online,
            "store registry ready"
        );
        registry
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Fetch every store concurrently.
    ///
    /// Waits for all of them; returns the first failure in declaration order.
    pub async fn refresh_all(&self) -> StoreResult<()> {
        let results = futures::join!(
            self.clients.fetch_all(),
            self.crews.fetch_all(),
            self.workers.fetch_all(),
            self.productions.fetch_all(),
            self.seasons.fetch_all(),
            self.grape_types.fetch_all(),
            self.packaging_types.fetch_all(),
            self.varieties.fetch_all(),
        );
        let (a, b, c, d, e, f, g, h) = results;
        [a, b, c, d, e, f, g, h].into_iter().collect()
    }
}

fn store<E: Entity>(gateway: &Arc<dyn RemoteGateway>, events: &EventBus, config: &SyncConfig) -> EntityStore<E> {
    EntityStore::with_policy(Arc::clone(gateway), events.clone(), config.delete_policy(E::KIND))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ClientDraft, CodedDraft, EntityKind};
    use crate::gateway::{GatewayError, InMemoryBackend};
    use crate::index::IndexInvalidation;
    use crate::store::DeletePolicy;

    #[tokio::test]
    async fn test_refresh_all_loads_every_store() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.seed::<Client>(&ClientDraft::new(1, "Norte")).unwrap();
        backend.seed::<Variety>(&CodedDraft::new(10, "Flame Seedless")).unwrap();
        let registry = StoreRegistry::new(backend.clone(), &SyncConfig::default());

        registry.refresh_all().await.unwrap();

        assert_eq!(registry.clients.items().len(), 1);
        assert_eq!(registry.varieties.items().len(), 1);
        assert!(registry.workers.items().is_empty());
        assert!(registry.connectivity.is_online());
    }

    #[tokio::test]
    async fn test_refresh_all_reports_failure_after_all_settle() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.seed::<Client>(&ClientDraft::new(1, "Norte")).unwrap();
        backend.fail_next("get_temporadas", GatewayError::Transport("offline".into()));
        let registry = StoreRegistry::new(backend.clone(), &SyncConfig::default());

        let err = registry.refresh_all().await.unwrap_err();
        assert_eq!(err.to_string(), "offline");
        assert_eq!(registry.clients.items().len(), 1);
        assert_eq!(registry.seasons.error().as_deref(), Some("offline"));
        assert_eq!(backend.call_count("get_tipo_empaque"), 1);
    }

    #[tokio::test]
    async fn test_config_reaches_stores() {
        let backend = Arc::new(InMemoryBackend::new());
        let config = SyncConfig {
            conservative_delete: [EntityKind::Production].into_iter().collect(),
            crew_index: IndexInvalidation::OnWorkerMutation,
            initially_online: false,
            ..SyncConfig::default()
        };
        let registry = StoreRegistry::new(backend, &config);

        assert_eq!(registry.productions.policy(), DeletePolicy::Conservative);
        assert_eq!(registry.workers.policy(), DeletePolicy::Optimistic);
        assert_eq!(registry.crew_index.mode(), IndexInvalidation::OnWorkerMutation);
        assert!(!registry.connectivity.is_online());
    }
}
