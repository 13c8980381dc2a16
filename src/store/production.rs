//! Production selectors over the cached list

use super::EntityStore;
use crate::entities::{Production, RecordId};

impl EntityStore<Production> {
    pub fn by_crew(&self, crew_id: RecordId) -> Vec<Production> {
        self.filter(|p| p.crew_id == crew_id)
    }

    pub fn by_season(&self, season_id: RecordId) -> Vec<Production> {
        self.filter(|p| p.season_id == season_id)
    }

    /// Sum of `quantity` across the cached list
    pub fn total_quantity(&self) -> f64 {
        self.state.borrow().items.iter().map(|p| p.quantity).sum()
    }

    pub fn total_quantity_for_crew(&self, crew_id: RecordId) -> f64 {
        self.state
            .borrow()
            .items
            .iter()
            .filter(|p| p.crew_id == crew_id)
            .map(|p| p.quantity)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ProductionDraft;
    use crate::events::EventBus;
    use crate::gateway::InMemoryBackend;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn batch(crew_id: RecordId, season_id: RecordId, quantity: f64) -> ProductionDraft {
        ProductionDraft {
            crew_id,
            season_id,
            grape_type_id: 1,
            packaging_type_id: 1,
            client_id: 1,
            quantity,
            rejected_boxes: 0,
            date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_selectors_read_cached_list() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.seed::<Production>(&batch(5, 1, 120.0)).unwrap();
        backend.seed::<Production>(&batch(5, 2, 80.5)).unwrap();
        backend.seed::<Production>(&batch(7, 1, 40.0)).unwrap();

        let store: EntityStore<Production> = EntityStore::new(backend, EventBus::default());
        assert_eq!(store.total_quantity(), 0.0);
        store.fetch_all().await.unwrap();

        assert_eq!(store.by_crew(5).len(), 2);
        assert_eq!(store.by_season(1).len(), 2);
        assert_eq!(store.total_quantity(), 240.5);
        assert_eq!(store.total_quantity_for_crew(5), 200.5);
        assert_eq!(store.total_quantity_for_crew(99), 0.0);
    }

    #[tokio::test]
    async fn test_add_returns_stored_record() {
        let backend = Arc::new(InMemoryBackend::new());
        let store: EntityStore<Production> = EntityStore::new(backend, EventBus::default());

        let receipt = store.add(batch(3, 1, 55.0)).await.unwrap();
        let id = receipt.record_id().unwrap() as RecordId;
        assert_eq!(store.find(id).map(|p| p.quantity), Some(55.0));
    }
}
