//! State shared between the coordinator and the reconciler.
//!
//! Both halves mutate the same view, pending-mutation map, deferred
//! event queues, and per-entity sequence watermarks, all behind a
//! single `RwLock`. Holding one lock for all of it means a local apply
//! and its bookkeeping are atomic with respect to incoming pushed
//! events.

use std::collections::HashMap;
use std::sync::Arc;

use bazaar_core::{ChangeKind, Record, RemoteChange};
use tokio::sync::RwLock;
use tracing::debug;

use crate::view::CollectionView;

/// Handle shared by a [`Coordinator`](crate::Coordinator) and its
/// [`Reconciler`](crate::Reconciler).
pub type SharedState<T> = Arc<RwLock<SyncState<T>>>;

/// Lifecycle of one optimistic mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStatus {
    /// Applied locally, remote call not yet resolved.
    Applied,
    /// Remote accepted; the local apply stands.
    Confirmed,
    /// Remote failed; the local apply was undone.
    RolledBack,
}

/// What must be undone if the remote call fails.
#[derive(Debug, Clone)]
pub enum PendingOp<T> {
    /// A row was pushed to the view front under a temp id.
    Create { payload: T },
    /// A row was patched in place; `snapshot` is the pre-patch value.
    Update { snapshot: T },
    /// A row was removed; restore `snapshot` at `index` on failure.
    Delete { snapshot: T, index: usize },
}

/// Bookkeeping for one in-flight optimistic mutation.
///
/// Keyed in the pending map by temp id for creates and by the real id
/// for updates and deletes. Destroyed when the mutation resolves.
#[derive(Debug, Clone)]
pub struct OptimisticRecord<T> {
    /// Set for creates; the id the local row carries until confirmation.
    pub temp_id: Option<String>,
    /// Learned from the create response or from a correlated insert echo.
    pub real_id: Option<String>,
    pub op: PendingOp<T>,
    pub status: MutationStatus,
}

/// The mutable heart of one collection's sync session.
pub struct SyncState<T: Record> {
    view: CollectionView<T>,
    /// In-flight optimistic mutations, at most one per record.
    pending: HashMap<String, OptimisticRecord<T>>,
    /// Pushed events held back because their record has an unresolved
    /// mutation, in arrival order.
    deferred: HashMap<String, Vec<RemoteChange<T>>>,
    /// Last applied sequence per entity id.
    applied_sequences: HashMap<String, i64>,
}

impl<T: Record> Default for SyncState<T> {
    fn default() -> Self {
        Self {
            view: CollectionView::new(),
            pending: HashMap::new(),
            deferred: HashMap::new(),
            applied_sequences: HashMap::new(),
        }
    }
}

impl<T: Record> SyncState<T> {
    /// A fresh state behind the shared lock.
    pub fn shared() -> SharedState<T> {
        Arc::new(RwLock::new(Self::default()))
    }

    pub fn view(&self) -> &CollectionView<T> {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut CollectionView<T> {
        &mut self.view
    }

    /// Whether `id` has an unresolved optimistic mutation.
    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.contains_key(id)
    }

    pub(crate) fn insert_pending(&mut self, key: String, record: OptimisticRecord<T>) {
        self.pending.insert(key, record);
    }

    pub(crate) fn take_pending(&mut self, key: &str) -> Option<OptimisticRecord<T>> {
        self.pending.remove(key)
    }

    pub(crate) fn pending_mut(&mut self, key: &str) -> Option<&mut OptimisticRecord<T>> {
        self.pending.get_mut(key)
    }

    /// Find the pending create whose payload carries this correlation
    /// ref and has not been matched to a real id yet.
    pub(crate) fn pending_create_for_ref(&self, client_ref: &str) -> Option<String> {
        self.pending.iter().find_map(|(key, record)| {
            let PendingOp::Create { payload } = &record.op else {
                return None;
            };
            (record.real_id.is_none() && payload.client_ref() == Some(client_ref))
                .then(|| key.clone())
        })
    }

    /// Record a sequence for an entity. Returns false when the event is
    /// stale or a duplicate and must be dropped.
    pub(crate) fn advance_sequence(&mut self, id: &str, sequence: i64) -> bool {
        match self.applied_sequences.get(id) {
            Some(&last) if sequence <= last => false,
            _ => {
                self.applied_sequences.insert(id.to_string(), sequence);
                true
            }
        }
    }

    /// Remove the pending create carrying this temp id, wherever it is
    /// keyed. A correlated insert echo re-keys a create from its temp
    /// id to the real id before the create call resolves.
    pub(crate) fn take_pending_by_temp(&mut self, temp_id: &str) -> Option<OptimisticRecord<T>> {
        let key = self
            .pending
            .iter()
            .find_map(|(key, record)| {
                (record.temp_id.as_deref() == Some(temp_id)).then(|| key.clone())
            })?;
        self.pending.remove(&key)
    }

    /// Queue an event for a record with an unresolved mutation.
    pub(crate) fn defer(&mut self, id: &str, change: RemoteChange<T>) {
        debug!(id, op = change.kind.op_name(), "deferring event behind pending mutation");
        self.deferred.entry(id.to_string()).or_default().push(change);
    }

    /// All events queued for `id`, in arrival order.
    pub(crate) fn drain_deferred(&mut self, id: &str) -> Vec<RemoteChange<T>> {
        self.deferred.remove(id).unwrap_or_default()
    }

    /// Fold a change into the view directly. Dedup and pending checks
    /// are the caller's business; this is the last step, shared by the
    /// reconciler's live path and the coordinator's deferred drain.
    pub(crate) fn fold_change(&mut self, kind: ChangeKind<T>) -> bool {
        match kind {
            ChangeKind::Inserted(record) => {
                let id = record.record_id().to_string();
                if self.view.contains(&id) {
                    self.view.substitute(&id, record)
                } else {
                    self.view.push_front(record);
                    true
                }
            }
            ChangeKind::Updated(record) => {
                // Unknown ids are ignored: the row may have been deleted
                // locally or never listed here
                self.view.replace(record)
            }
            ChangeKind::Deleted(id) => self.view.remove(&id).is_some(),
        }
    }
}
