//! Optimistic mutation coordinator.
//!
//! Every mutation follows the same shape: apply to the local view
//! inside one lock section, invalidate the affected cache keys, issue
//! the remote call, then confirm or roll back. A failed mutation leaves
//! the view element-for-element identical to its pre-mutation state and
//! surfaces the remote error to the caller. There is no automatic
//! retry.

use std::sync::Arc;

use bazaar_core::{new_temp_id, BazaarError, Record};
use bazaar_cache::{CacheKey, CacheStore};
use serde_json::Value;
use tracing::{debug, warn};

use crate::patch::apply_patch;
use crate::remote::RemoteSource;
use crate::state::{MutationStatus, OptimisticRecord, PendingOp, SharedState, SyncState};

/// Applies mutations optimistically and reconciles them with the
/// remote store's verdict.
pub struct Coordinator<T: Record, R: RemoteSource<T>> {
    state: SharedState<T>,
    remote: Arc<R>,
    cache: CacheStore,
}

impl<T: Record, R: RemoteSource<T>> Coordinator<T, R> {
    pub fn new(state: SharedState<T>, remote: Arc<R>, cache: CacheStore) -> Self {
        Self {
            state,
            remote,
            cache,
        }
    }

    /// Current rows in view order.
    pub async fn snapshot(&self) -> Vec<T> {
        self.state.read().await.view().snapshot()
    }

    /// Replace the view with a freshly listed page of records.
    /// Intended for initial load; rows of in-flight mutations are
    /// discarded along with everything else.
    pub async fn hydrate(&self, records: Vec<T>) {
        self.state.write().await.view_mut().replace_all(records);
    }

    /// Create a record optimistically.
    ///
    /// The payload appears at the front of the view under a synthesized
    /// temp id before the remote call is issued. On success the temp id
    /// is swapped for the store's real id and the returned record
    /// carries it; on failure the row is removed again.
    pub async fn create(&self, mut payload: T) -> Result<T, BazaarError> {
        let temp_id = new_temp_id();
        payload.set_record_id(temp_id.clone());

        {
            let mut state = self.state.write().await;
            state.view_mut().push_front(payload.clone());
            state.insert_pending(
                temp_id.clone(),
                OptimisticRecord {
                    temp_id: Some(temp_id.clone()),
                    real_id: None,
                    op: PendingOp::Create {
                        payload: payload.clone(),
                    },
                    status: MutationStatus::Applied,
                },
            );
        }
        // Any cached list may now be missing the new row
        self.invalidate_lists().await;

        match self.remote.create(&payload).await {
            Ok(real_id) => {
                let drained_any = {
                    let mut state = self.state.write().await;
                    if let Some(mut record) = state.take_pending_by_temp(&temp_id) {
                        record.real_id = Some(real_id.clone());
                        record.status = MutationStatus::Confirmed;
                    }

                    if state.view().contains(&real_id) {
                        // An insert echo already brought the server row;
                        // drop the temp row if it is somehow still there
                        state.view_mut().remove(&temp_id);
                        if let Some(current) = state.view().get(&real_id) {
                            payload = current.clone();
                        }
                    } else {
                        payload.set_record_id(real_id.clone());
                        state.view_mut().substitute(&temp_id, payload.clone());
                    }

                    self.fold_deferred(&mut state, &real_id)
                };
                debug!(collection = %T::collection(), id = %real_id, "create confirmed");
                self.invalidate_record(&real_id).await;
                if drained_any {
                    self.invalidate_lists().await;
                }
                Ok(payload)
            }
            Err(e) => {
                let real_id = {
                    let mut state = self.state.write().await;
                    let record = state.take_pending_by_temp(&temp_id);
                    state.view_mut().remove(&temp_id);
                    let real_id = record.and_then(|r| r.real_id);
                    if let Some(real_id) = &real_id {
                        // The echo landed even though the call failed;
                        // the server row stays, queued events catch up
                        self.fold_deferred(&mut state, real_id);
                    }
                    real_id
                };
                if let Some(real_id) = real_id {
                    self.invalidate_record(&real_id).await;
                }
                self.invalidate_lists().await;
                warn!(collection = %T::collection(), error = %e, "create failed, rolled back");
                Err(e.into())
            }
        }
    }

    /// Patch a record optimistically.
    pub async fn update(&self, id: &str, patch: Value) -> Result<(), BazaarError> {
        {
            let mut state = self.state.write().await;
            if state.is_pending(id) {
                return Err(BazaarError::MutationInFlight { id: id.to_string() });
            }
            let current = state
                .view()
                .get(id)
                .cloned()
                .ok_or_else(|| BazaarError::NotInView { id: id.to_string() })?;
            let patched = apply_patch(&current, &patch)?;
            state.view_mut().replace(patched);
            state.insert_pending(
                id.to_string(),
                OptimisticRecord {
                    temp_id: None,
                    real_id: Some(id.to_string()),
                    op: PendingOp::Update { snapshot: current },
                    status: MutationStatus::Applied,
                },
            );
        }
        self.invalidate_record(id).await;

        self.push_update(id, patch).await
    }

    /// Flip a boolean field and move its companion counter in the same
    /// local transaction, so no reader ever sees the flag without the
    /// count (or the other way round). Remotely this is a plain
    /// two-field update.
    pub async fn toggle(
        &self,
        id: &str,
        flag_field: &str,
        counter_field: &str,
    ) -> Result<(), BazaarError> {
        let patch = {
            let mut state = self.state.write().await;
            if state.is_pending(id) {
                return Err(BazaarError::MutationInFlight { id: id.to_string() });
            }
            let current = state
                .view()
                .get(id)
                .cloned()
                .ok_or_else(|| BazaarError::NotInView { id: id.to_string() })?;

            let as_json = serde_json::to_value(&current).map_err(|e| BazaarError::Patch {
                reason: e.to_string(),
            })?;
            let flag = as_json
                .get(flag_field)
                .and_then(Value::as_bool)
                .ok_or_else(|| BazaarError::Patch {
                    reason: format!("{flag_field} is not a boolean field"),
                })?;
            let count = as_json
                .get(counter_field)
                .and_then(Value::as_i64)
                .ok_or_else(|| BazaarError::Patch {
                    reason: format!("{counter_field} is not an integer field"),
                })?;

            let flipped = !flag;
            let mut fields = serde_json::Map::new();
            fields.insert(flag_field.to_string(), Value::Bool(flipped));
            fields.insert(
                counter_field.to_string(),
                Value::from(if flipped { count + 1 } else { count - 1 }),
            );
            let patch = Value::Object(fields);

            let patched = apply_patch(&current, &patch)?;
            state.view_mut().replace(patched);
            state.insert_pending(
                id.to_string(),
                OptimisticRecord {
                    temp_id: None,
                    real_id: Some(id.to_string()),
                    op: PendingOp::Update { snapshot: current },
                    status: MutationStatus::Applied,
                },
            );
            patch
        };
        self.invalidate_record(id).await;

        self.push_update(id, patch).await
    }

    /// Delete a record optimistically. On failure the row returns to
    /// its original position (clamped if the view shrank meanwhile).
    pub async fn delete(&self, id: &str) -> Result<(), BazaarError> {
        {
            let mut state = self.state.write().await;
            if state.is_pending(id) {
                return Err(BazaarError::MutationInFlight { id: id.to_string() });
            }
            let (index, snapshot) = state
                .view_mut()
                .remove(id)
                .ok_or_else(|| BazaarError::NotInView { id: id.to_string() })?;
            state.insert_pending(
                id.to_string(),
                OptimisticRecord {
                    temp_id: None,
                    real_id: Some(id.to_string()),
                    op: PendingOp::Delete { snapshot, index },
                    status: MutationStatus::Applied,
                },
            );
        }
        self.invalidate_record(id).await;
        self.invalidate_lists().await;

        match self.remote.delete(id).await {
            Ok(()) => {
                self.resolve(id, true).await;
                Ok(())
            }
            Err(e) => {
                self.resolve(id, false).await;
                warn!(collection = %T::collection(), id, error = %e, "delete failed, rolled back");
                Err(e.into())
            }
        }
    }

    /// Shared remote tail of `update` and `toggle`.
    async fn push_update(&self, id: &str, patch: Value) -> Result<(), BazaarError> {
        match self.remote.update(id, &patch).await {
            Ok(()) => {
                self.resolve(id, true).await;
                Ok(())
            }
            Err(e) => {
                self.resolve(id, false).await;
                warn!(collection = %T::collection(), id, error = %e, "update failed, rolled back");
                Err(e.into())
            }
        }
    }

    /// Settle a pending update or delete: undo the local apply if the
    /// remote refused, then let the events queued behind it catch up,
    /// in arrival order.
    async fn resolve(&self, id: &str, confirmed: bool) {
        let drained_any = {
            let mut state = self.state.write().await;
            if let Some(mut record) = state.take_pending(id) {
                if confirmed {
                    record.status = MutationStatus::Confirmed;
                } else {
                    record.status = MutationStatus::RolledBack;
                    match record.op {
                        PendingOp::Update { snapshot } => {
                            state.view_mut().replace(snapshot);
                        }
                        PendingOp::Delete { snapshot, index } => {
                            state.view_mut().insert_at(index, snapshot);
                        }
                        PendingOp::Create { .. } => {
                            state.view_mut().remove(id);
                        }
                    }
                }
            }
            self.fold_deferred(&mut state, id)
        };
        self.invalidate_record(id).await;
        if drained_any {
            self.invalidate_lists().await;
        }
    }

    /// Apply the events deferred behind `id`. Dedup was settled when
    /// they were queued. Returns whether anything was applied.
    fn fold_deferred(&self, state: &mut SyncState<T>, id: &str) -> bool {
        let drained = state.drain_deferred(id);
        let any = !drained.is_empty();
        for change in drained {
            debug!(id, op = change.kind.op_name(), "applying deferred event");
            state.fold_change(change.kind);
        }
        any
    }

    async fn invalidate_record(&self, id: &str) {
        self.cache
            .remove(&CacheKey::for_id(T::collection(), id))
            .await;
    }

    async fn invalidate_lists(&self) {
        self.cache
            .remove_by_prefix(&CacheKey::list_prefix(T::collection()))
            .await;
    }
}
