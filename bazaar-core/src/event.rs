//! Realtime change events pushed by the remote store.

use serde::{Deserialize, Serialize};

/// What happened to a record on the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op", content = "body")]
pub enum ChangeKind<T> {
    /// A record was created; carries the full record with its real id.
    Inserted(T),
    /// A record was modified; carries the full post-update record.
    Updated(T),
    /// A record was removed; carries only the id.
    Deleted(String),
}

impl<T> ChangeKind<T> {
    /// Short name for log fields.
    pub fn op_name(&self) -> &'static str {
        match self {
            ChangeKind::Inserted(_) => "inserted",
            ChangeKind::Updated(_) => "updated",
            ChangeKind::Deleted(_) => "deleted",
        }
    }
}

/// One pushed change, ordered per entity by `sequence`.
///
/// `sequence` is whatever the remote store provides as a per-entity
/// monotonic value (a server timestamp in millis or an event counter).
/// The reconciler keeps the last applied sequence per entity and drops
/// anything at or below it, which makes at-least-once delivery safe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteChange<T> {
    pub sequence: i64,
    pub kind: ChangeKind<T>,
}

impl<T> RemoteChange<T> {
    pub fn new(sequence: i64, kind: ChangeKind<T>) -> Self {
        Self { sequence, kind }
    }
}
