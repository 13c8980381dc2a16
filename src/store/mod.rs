//! Entity Store
//!
//! One parametric cache per entity type. A store holds the last fetched
//! collection plus `loading`/`error` flags and keeps them consistent with the
//! backend by resynchronising after every successful mutation.
//!
//! State lives in a `watch` channel so reads are cheap synchronous snapshots
//! and consumers can subscribe to re-render on every change.

pub mod crew;
pub mod production;

use serde::Serialize;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::entities::{CommandSet, Entity, EntityKind};
use crate::error::{StoreError, StoreResult};
use crate::events::{EventBus, StoreEvent};
use crate::gateway::{invoke_typed, GatewayCall, Receipt, RemoteGateway};

/// When a deleted row leaves the cached list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletePolicy {
    /// Remove immediately, before the backend answers
    #[default]
    Optimistic,
    /// Remove only once the backend confirms
    Conservative,
}

/// Observable state of one store
#[derive(Debug, Clone)]
pub struct StoreState<E> {
    /// Active collection as of the last successful fetch
    pub items: Vec<E>,
    /// Inactive partition, for entities that soft-delete
    pub inactive: Vec<E>,
    /// Message of the last failure, cleared when an operation starts
    pub error: Option<String>,
    in_flight: usize,
}

impl<E> StoreState<E> {
    /// True while at least one request is outstanding
    pub fn loading(&self) -> bool {
        self.in_flight > 0
    }
}

impl<E> Default for StoreState<E> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            inactive: Vec::new(),
            error: None,
            in_flight: 0,
        }
    }
}

/// Marks one outstanding request; settles it on drop.
struct InFlight<'a, E> {
    state: &'a watch::Sender<StoreState<E>>,
}

impl<E> Drop for InFlight<'_, E> {
    fn drop(&mut self) {
        self.state
            .send_modify(|s| s.in_flight = s.in_flight.saturating_sub(1));
    }
}

/// Cache of one entity type kept in sync with the remote backend
pub struct EntityStore<E: Entity> {
    gateway: Arc<dyn RemoteGateway>,
    state: watch::Sender<StoreState<E>>,
    policy: DeletePolicy,
    events: EventBus,
}

impl<E: Entity> EntityStore<E> {
    pub fn new(gateway: Arc<dyn RemoteGateway>, events: EventBus) -> Self {
        Self::with_policy(gateway, events, DeletePolicy::default())
    }

    pub fn with_policy(gateway: Arc<dyn RemoteGateway>, events: EventBus, policy: DeletePolicy) -> Self {
        let (state, _) = watch::channel(StoreState::default());
        Self {
            gateway,
            state,
            policy,
            events,
        }
    }

    pub fn kind(&self) -> EntityKind {
        E::KIND
    }

    pub fn commands(&self) -> CommandSet {
        E::COMMANDS
    }

    pub fn policy(&self) -> DeletePolicy {
        self.policy
    }

    // ---- reads ----

    /// The cached active collection
    pub fn items(&self) -> Vec<E> {
        self.state.borrow().items.clone()
    }

    /// The cached inactive collection
    pub fn inactive(&self) -> Vec<E> {
        self.state.borrow().inactive.clone()
    }

    pub fn loading(&self) -> bool {
        self.state.borrow().loading()
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn snapshot(&self) -> StoreState<E> {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<StoreState<E>> {
        self.state.subscribe()
    }

    /// Look up a record in the cached list without calling the backend
    pub fn find(&self, id: E::Id) -> Option<E> {
        self.state.borrow().items.iter().find(|e| e.id() == id).cloned()
    }

    /// Records in the cached list matching a predicate
    pub fn filter<P>(&self, mut predicate: P) -> Vec<E>
    where
        P: FnMut(&E) -> bool,
    {
        self.state
            .borrow()
            .items
            .iter()
            .filter(|e| predicate(e))
            .cloned()
            .collect()
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|s| s.error = None);
    }

    // ---- remote operations ----

    /// Replace the cached collection with the backend's
    pub async fn fetch_all(&self) -> StoreResult<()> {
        let _guard = self.begin();
        let call = GatewayCall::bare(E::COMMANDS.list);
        match invoke_typed::<Vec<E>>(self.gateway.as_ref(), call).await {
            Ok(items) => {
                let count = items.len();
                self.state.send_modify(|s| {
                    s.items = items;
                    s.error = None;
                });
                debug!(kind = %E::KIND, count, "collection fetched");
                self.events.publish(StoreEvent::Fetched { kind: E::KIND, count });
                Ok(())
            }
            Err(err) => Err(self.record_failure("fetch_all", err)),
        }
    }

    /// Point lookup that bypasses the cache.
    ///
    /// Leaves `loading`, `error` and the cached list untouched; a missing
    /// record is `Ok(None)`.
    pub async fn get_by_id(&self, id: E::Id) -> StoreResult<Option<E>> {
        let call = GatewayCall::new(E::COMMANDS.get_by_id, id_args(id)?);
        invoke_typed(self.gateway.as_ref(), call).await.map_err(|err| {
            debug!(kind = %E::KIND, %id, error = %err, "point lookup failed");
            err
        })
    }

    /// Insert a new record, then resynchronise
    pub async fn add(&self, draft: E::Draft) -> StoreResult<Receipt> {
        let _guard = self.begin();
        let args = match encode(&draft) {
            Ok(data) => json!({ "data": data }),
            Err(err) => return Err(self.record_failure("add", err)),
        };
        let receipt = self.mutate("add", E::COMMANDS.insert, args).await?;
        self.events.publish(StoreEvent::Added { kind: E::KIND });
        self.resync().await;
        Ok(receipt)
    }

    /// Update an existing record, then resynchronise
    pub async fn update(&self, id: E::Id, draft: E::Draft) -> StoreResult<Receipt> {
        let _guard = self.begin();
        let args = match (encode(&id), encode(&draft)) {
            (Ok(id), Ok(data)) => json!({ "id": id, "data": data }),
            (Err(err), _) | (_, Err(err)) => return Err(self.record_failure("update", err)),
        };
        let receipt = self.mutate("update", E::COMMANDS.update, args).await?;
        self.events.publish(StoreEvent::Updated {
            kind: E::KIND,
            id: id.to_string(),
        });
        self.resync().await;
        Ok(receipt)
    }

    /// Delete a record.
    ///
    /// Under [`DeletePolicy::Optimistic`] the row leaves the cached list on
    /// the first poll, before the backend answers. If the backend then
    /// fails, the store re-fetches instead of reinserting the row.
    pub fn delete(&self, id: E::Id) -> impl Future<Output = StoreResult<Receipt>> + Send + '_ {
        self.remove_with("delete", E::COMMANDS.delete, id)
    }

    /// Active/inactive partition in one request
    pub async fn fetch_partitioned(&self) -> StoreResult<()> {
        let command = self.extension(E::COMMANDS.list_all, "fetch_partitioned")?;
        let _guard = self.begin();
        match invoke_typed::<Vec<E>>(self.gateway.as_ref(), GatewayCall::bare(command)).await {
            Ok(all) => {
                let count = all.len();
                let (active, inactive): (Vec<E>, Vec<E>) = all.into_iter().partition(E::is_active);
                self.state.send_modify(|s| {
                    s.items = active;
                    s.inactive = inactive;
                    s.error = None;
                });
                self.events.publish(StoreEvent::Fetched { kind: E::KIND, count });
                Ok(())
            }
            Err(err) => Err(self.record_failure("fetch_partitioned", err)),
        }
    }

    /// Replace the cached inactive collection
    pub async fn fetch_inactive(&self) -> StoreResult<()> {
        let command = self.extension(E::COMMANDS.list_inactive, "fetch_inactive")?;
        let _guard = self.begin();
        match invoke_typed::<Vec<E>>(self.gateway.as_ref(), GatewayCall::bare(command)).await {
            Ok(inactive) => {
                debug!(kind = %E::KIND, count = inactive.len(), "inactive collection fetched");
                self.state.send_modify(|s| {
                    s.inactive = inactive;
                    s.error = None;
                });
                Ok(())
            }
            Err(err) => Err(self.record_failure("fetch_inactive", err)),
        }
    }

    /// Bring a soft-deleted record back, then resynchronise
    pub async fn reactivate(&self, id: E::Id) -> StoreResult<Receipt> {
        let command = self.extension(E::COMMANDS.reactivate, "reactivate")?;
        let _guard = self.begin();
        let args = match id_args(id) {
            Ok(args) => args,
            Err(err) => return Err(self.record_failure("reactivate", err)),
        };
        let receipt = self.mutate("reactivate", command, args).await?;
        self.events.publish(StoreEvent::Reactivated {
            kind: E::KIND,
            id: id.to_string(),
        });
        self.resync().await;
        Ok(receipt)
    }

    // ---- internals ----

    /// Start an operation: count it as in flight and clear the last error
    fn begin(&self) -> InFlight<'_, E> {
        self.state.send_modify(|s| {
            s.in_flight += 1;
            s.error = None;
        });
        InFlight { state: &self.state }
    }

    fn record_failure(&self, operation: &'static str, err: StoreError) -> StoreError {
        warn!(kind = %E::KIND, operation, error = %err, "store operation failed");
        let message = err.to_string();
        self.state.send_modify(|s| s.error = Some(message.clone()));
        self.events.publish(StoreEvent::Failed { kind: E::KIND, message });
        err
    }

    fn extension(&self, command: Option<&'static str>, operation: &'static str) -> StoreResult<&'static str> {
        command.ok_or(StoreError::Unsupported {
            kind: E::KIND.as_str(),
            operation,
        })
    }

    /// Send a mutating command, recording a failure in the error field
    async fn mutate(&self, operation: &'static str, command: &str, args: Value) -> StoreResult<Receipt> {
        invoke_typed(self.gateway.as_ref(), GatewayCall::new(command, args))
            .await
            .map_err(|err| self.record_failure(operation, err))
    }

    /// Re-fetch after a successful mutation.
    ///
    /// Failures land in the error field only; the mutation itself succeeded.
    async fn resync(&self) {
        debug!(kind = %E::KIND, "resynchronising");
        if self.fetch_all().await.is_err() {
            return;
        }
        if E::COMMANDS.list_inactive.is_some() {
            let _ = self.fetch_inactive().await;
        }
    }

    /// Shared delete path for `delete` and entity-specific variants
    fn remove_with(
        &self,
        operation: &'static str,
        command: &'static str,
        id: E::Id,
    ) -> impl Future<Output = StoreResult<Receipt>> + Send + '_ {
        let optimistic = self.policy == DeletePolicy::Optimistic;

        async move {
            let _guard = self.begin();
            // Removal and the remote call happen in the same poll, so a
            // future dropped unpolled leaves the list untouched.
            if optimistic {
                self.state.send_modify(|s| s.items.retain(|e| e.id() != id));
            }
            let args = match id_args(id) {
                Ok(args) => args,
                Err(err) => return Err(self.record_failure(operation, err)),
            };
            match invoke_typed::<Receipt>(self.gateway.as_ref(), GatewayCall::new(command, args)).await {
                Ok(receipt) => {
                    if !optimistic {
                        self.state.send_modify(|s| s.items.retain(|e| e.id() != id));
                    }
                    self.events.publish(StoreEvent::Deleted {
                        kind: E::KIND,
                        id: id.to_string(),
                    });
                    self.resync().await;
                    Ok(receipt)
                }
                Err(err) => {
                    if optimistic {
                        // Reconverge with the backend; never reinsert the row.
                        let _ = self.fetch_all().await;
                    }
                    Err(self.record_failure(operation, err))
                }
            }
        }
    }
}

impl<E: Entity> std::fmt::Debug for EntityStore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("EntityStore")
            .field("kind", &E::KIND)
            .field("policy", &self.policy)
            .field("items", &state.items.len())
            .field("loading", &state.loading())
            .field("error", &state.error)
            .finish()
    }
}

fn encode<T: Serialize>(value: &T) -> StoreResult<Value> {
    Ok(serde_json::to_value(value)?)
}

fn id_args<I: Serialize>(id: I) -> StoreResult<Value> {
    Ok(json!({ "id": encode(&id)? }))
}
