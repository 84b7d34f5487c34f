//! Realtime reconciler for pushed remote changes.
//!
//! Consumes the remote store's push stream and folds each change into
//! the shared view. Three rules keep at-least-once, out-of-order
//! delivery safe:
//!
//! 1. Per-entity sequence watermarks drop stale and duplicate events.
//! 2. An insert carrying this client's own correlation ref replaces the
//!    pending optimistic row in place instead of appending a duplicate.
//! 3. Events for a record with an unresolved optimistic mutation are
//!    queued and applied after the mutation settles.

use bazaar_core::{ChangeKind, Record, RemoteChange};
use bazaar_cache::{CacheKey, CacheStore};
use tokio::sync::mpsc;
use tracing::debug;

use crate::state::SharedState;

/// What became of one pushed change.
enum Outcome {
    /// Folded into the view; the id's cache entries are now stale.
    Applied(String),
    /// Queued behind a pending mutation.
    Deferred,
    /// Stale or duplicate sequence.
    Dropped,
}

/// Folds pushed changes into the view shared with a
/// [`Coordinator`](crate::Coordinator).
pub struct Reconciler<T: Record> {
    state: SharedState<T>,
    cache: CacheStore,
}

impl<T: Record> Reconciler<T> {
    pub fn new(state: SharedState<T>, cache: CacheStore) -> Self {
        Self { state, cache }
    }

    /// Consume changes until the channel closes. A disconnect is not an
    /// error: the stream simply ends and TTL reads stay correct.
    pub async fn drive(&self, mut changes: mpsc::Receiver<RemoteChange<T>>) {
        while let Some(change) = changes.recv().await {
            self.apply(change).await;
        }
        debug!(collection = %T::collection(), "change stream closed");
    }

    /// Fold one pushed change into the shared state.
    pub async fn apply(&self, change: RemoteChange<T>) {
        let outcome = {
            let mut state = self.state.write().await;
            let id = entity_id(&change.kind).to_string();

            if !state.advance_sequence(&id, change.sequence) {
                debug!(
                    collection = %T::collection(),
                    id = %id,
                    sequence = change.sequence,
                    "dropping stale or duplicate event"
                );
                Outcome::Dropped
            } else {
                match change.kind {
                    ChangeKind::Inserted(record) => {
                        if let Some(temp_id) = record
                            .client_ref()
                            .and_then(|cref| state.pending_create_for_ref(cref))
                        {
                            // Echo of this client's own pending create:
                            // swap the temp row for the server's version
                            // and re-key the pending record so later
                            // events queue behind it until it resolves
                            debug!(
                                collection = %T::collection(),
                                temp_id = %temp_id,
                                real_id = %id,
                                "matched insert echo to pending create"
                            );
                            state.view_mut().substitute(&temp_id, record);
                            if let Some(mut pending) = state.take_pending(&temp_id) {
                                pending.real_id = Some(id.clone());
                                state.insert_pending(id.clone(), pending);
                            }
                            Outcome::Applied(id)
                        } else {
                            state.fold_change(ChangeKind::Inserted(record));
                            Outcome::Applied(id)
                        }
                    }
                    ChangeKind::Updated(record) => {
                        if state.is_pending(&id) {
                            state.defer(&id, RemoteChange::new(
                                change.sequence,
                                ChangeKind::Updated(record),
                            ));
                            Outcome::Deferred
                        } else {
                            state.fold_change(ChangeKind::Updated(record));
                            Outcome::Applied(id)
                        }
                    }
                    ChangeKind::Deleted(deleted_id) => {
                        if state.is_pending(&id) {
                            state.defer(&id, RemoteChange::new(
                                change.sequence,
                                ChangeKind::Deleted(deleted_id),
                            ));
                            Outcome::Deferred
                        } else {
                            state.fold_change(ChangeKind::Deleted(deleted_id));
                            Outcome::Applied(id)
                        }
                    }
                }
            }
        };

        // Applied changes make the TTL path stale too
        if let Outcome::Applied(id) = outcome {
            self.cache
                .remove(&CacheKey::for_id(T::collection(), &id))
                .await;
            self.cache
                .remove_by_prefix(&CacheKey::list_prefix(T::collection()))
                .await;
        }
    }
}

/// The id a change is about.
fn entity_id<T: Record>(kind: &ChangeKind<T>) -> &str {
    match kind {
        ChangeKind::Inserted(record) | ChangeKind::Updated(record) => record.record_id(),
        ChangeKind::Deleted(id) => id,
    }
}
