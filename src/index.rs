//! Cross-Entity Index Cache
//!
//! Maps a crew id to the workers assigned to it, fetched on demand from the
//! backend. Entries stay put once set: adding, deleting or moving a worker
//! through the worker store does not touch them, so an entry reflects the
//! backend only as of the last `fetch_for_crew` for that crew. Callers
//! re-fetch affected crews themselves.
//!
//! With [`IndexInvalidation::OnWorkerMutation`] a listener on the event bus
//! drops every entry whenever a worker mutation is published instead. A
//! fetch that was already in flight when the listener dropped the entries
//! returns its answer to the caller but does not cache it.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::entities::{Entity, RecordId, Worker};
use crate::error::{StoreError, StoreResult};
use crate::events::{EventBus, StoreEvent};
use crate::gateway::{invoke_typed, GatewayCall, RemoteGateway};

/// How cached crew entries react to worker mutations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexInvalidation {
    /// Entries change only through explicit fetch/invalidate calls
    #[default]
    Manual,
    /// Every worker mutation drops all entries
    OnWorkerMutation,
}

impl std::str::FromStr for IndexInvalidation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            "on_worker_mutation" => Ok(Self::OnWorkerMutation),
            other => Err(format!("Unknown index invalidation mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IndexState {
    pub entries: HashMap<RecordId, Vec<Worker>>,
    pub error: Option<String>,
    in_flight: usize,
    generation: u64,
}

impl IndexState {
    pub fn loading(&self) -> bool {
        self.in_flight > 0
    }
}

/// Marks one outstanding crew fetch; settles it on drop.
struct Pending<'a> {
    state: &'a watch::Sender<IndexState>,
}

impl<'a> Pending<'a> {
    fn start(state: &'a watch::Sender<IndexState>) -> (Self, u64) {
        let mut generation = 0;
        state.send_modify(|s| {
            s.in_flight += 1;
            s.error = None;
            generation = s.generation;
        });
        (Self { state }, generation)
    }
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        self.state
            .send_modify(|s| s.in_flight = s.in_flight.saturating_sub(1));
    }
}

/// Crew id to member workers
pub struct WorkersByCrew {
    gateway: Arc<dyn RemoteGateway>,
    state: Arc<watch::Sender<IndexState>>,
    mode: IndexInvalidation,
    listener: Option<JoinHandle<()>>,
}

impl WorkersByCrew {
    /// Index with the manual-refresh contract
    pub fn new(gateway: Arc<dyn RemoteGateway>) -> Self {
        let (state, _) = watch::channel(IndexState::default());
        Self {
            gateway,
            state: Arc::new(state),
            mode: IndexInvalidation::Manual,
            listener: None,
        }
    }

    /// Index that follows `mode`, listening on `events` when it needs to.
    ///
    /// The listener is a tokio task; without a runtime the index stays manual.
    pub fn with_invalidation(gateway: Arc<dyn RemoteGateway>, mode: IndexInvalidation, events: &EventBus) -> Self {
        let mut index = Self::new(gateway);
        if mode == IndexInvalidation::OnWorkerMutation {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let state = Arc::clone(&index.state);
                    index.listener = Some(handle.spawn(drop_on_worker_mutation(state, events.subscribe())));
                    index.mode = mode;
                }
                Err(_) => warn!("no tokio runtime; crew index falls back to manual invalidation"),
            }
        }
        index
    }

    pub fn mode(&self) -> IndexInvalidation {
        self.mode
    }

    /// Populate or replace the entry for `crew_id`.
    ///
    /// Overlapping fetches for the same crew are neither merged nor ordered:
    /// each writes its answer when it settles, so the last to settle wins.
    /// An answer that settles after the invalidation listener dropped the
    /// index is returned but not cached.
    pub async fn fetch_for_crew(&self, crew_id: RecordId) -> StoreResult<Vec<Worker>> {
        let lookup = Worker::COMMANDS.list_by_parent.ok_or(StoreError::Unsupported {
            kind: Worker::KIND.as_str(),
            operation: "fetch_for_crew",
        })?;

        let (pending, started) = Pending::start(&self.state);
        let mut args = Map::new();
        args.insert(lookup.arg.to_string(), json!(crew_id));
        let call = GatewayCall::new(lookup.command, Value::Object(args));
        let result = invoke_typed::<Vec<Worker>>(self.gateway.as_ref(), call).await;

        self.state.send_modify(|s| match &result {
            Ok(workers) if s.generation == started => {
                s.entries.insert(crew_id, workers.clone());
            }
            Ok(_) => debug!(crew_id, "crew index dropped mid-fetch; answer not cached"),
            Err(err) => s.error = Some(err.to_string()),
        });
        drop(pending);
        match &result {
            Ok(workers) => debug!(crew_id, count = workers.len(), "crew members fetched"),
            Err(err) => warn!(crew_id, error = %err, "crew members fetch failed"),
        }
        result
    }

    /// Cached members of a crew, if fetched
    pub fn get(&self, crew_id: RecordId) -> Option<Vec<Worker>> {
        self.state.borrow().entries.get(&crew_id).cloned()
    }

    pub fn contains(&self, crew_id: RecordId) -> bool {
        self.state.borrow().entries.contains_key(&crew_id)
    }

    pub fn snapshot(&self) -> IndexState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<IndexState> {
        self.state.subscribe()
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn loading(&self) -> bool {
        self.state.borrow().loading()
    }

    /// Drop one entry; returns whether it was cached
    pub fn invalidate(&self, crew_id: RecordId) -> bool {
        let mut removed = false;
        self.state.send_modify(|s| removed = s.entries.remove(&crew_id).is_some());
        removed
    }

    pub fn clear(&self) {
        self.state.send_modify(|s| s.entries.clear());
    }
}

impl Drop for WorkersByCrew {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

async fn drop_on_worker_mutation(state: Arc<watch::Sender<IndexState>>, mut rx: broadcast::Receiver<StoreEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) if event.touches_workers() => {
                debug!(?event, "worker mutation; dropping crew index");
                state.send_modify(drop_entries);
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                // Missed events may have been worker mutations.
                info!(skipped, "crew index listener lagged; dropping crew index");
                state.send_modify(drop_entries);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Clear every entry and supersede fetches still in flight
fn drop_entries(state: &mut IndexState) {
    state.entries.clear();
    state.generation += 1;
}
