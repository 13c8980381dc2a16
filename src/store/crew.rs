//! Crew-specific store operations

use serde_json::json;
use std::future::Future;
use tracing::{debug, info};

use super::{id_args, EntityStore};
use crate::entities::crew::{DELETE_WARNING_COMMAND, FORCE_DELETE_COMMAND, REASSIGN_MEMBERS_COMMAND};
use crate::entities::{Crew, RecordId};
use crate::error::StoreResult;
use crate::events::StoreEvent;
use crate::gateway::{invoke_typed, GatewayCall, Receipt};

impl EntityStore<Crew> {
    /// Ask the backend what deleting `id` would orphan.
    ///
    /// Empty when the crew has no assigned workers. Read-only, like
    /// `get_by_id`: store flags are not touched.
    pub async fn delete_warning(&self, id: RecordId) -> StoreResult<String> {
        let call = GatewayCall::new(DELETE_WARNING_COMMAND, json!({ "id": id }));
        invoke_typed(self.gateway.as_ref(), call).await
    }

    /// Delete a crew after unassigning its workers. Follows the store's delete policy.
    pub fn force_delete(&self, id: RecordId) -> impl Future<Output = StoreResult<Receipt>> + Send + '_ {
        let removal = self.remove_with("force_delete", FORCE_DELETE_COMMAND, id);
        async move {
            let receipt = removal.await?;
            info!(crew_id = id, "crew force-deleted");
            self.events.publish(StoreEvent::MembersReleased { crew_id: id.to_string() });
            Ok(receipt)
        }
    }

    /// Unassign every worker from the crew, then resynchronise crews
    pub async fn reassign_members(&self, id: RecordId) -> StoreResult<Receipt> {
        let _guard = self.begin();
        let args = match id_args(id) {
            Ok(args) => args,
            Err(err) => return Err(self.record_failure("reassign_members", err)),
        };
        let receipt = self.mutate("reassign_members", REASSIGN_MEMBERS_COMMAND, args).await?;
        debug!(crew_id = id, %receipt, "crew members released");
        self.events.publish(StoreEvent::MembersReleased { crew_id: id.to_string() });
        self.resync().await;
        Ok(receipt)
    }
}
