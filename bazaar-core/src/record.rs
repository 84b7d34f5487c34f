//! Record marker trait for types that flow through the cache and sync layers.

use serde::{de::DeserializeOwned, Serialize};

use crate::Collection;

/// Marker trait for entity types managed by the sync layer.
///
/// # Implementation Requirements
///
/// - `collection()` must return a consistent value for all instances
/// - `record_id()` returns the current identifier: either the remote
///   store's authoritative id, or a temporary id while an optimistic
///   create is in flight
/// - `set_record_id()` is called exactly once per optimistic create,
///   when the remote store confirms and assigns the authoritative id
/// - `client_ref()` is a client-generated correlation attribute set at
///   create time. Pushed `Inserted` events for this client's own writes
///   carry the same value, which is how the reconciler matches an echo
///   to its pending optimistic row instead of appending a duplicate.
///   Types never created optimistically may leave the default `None`.
/// - Implementations must be `Clone + Serialize + DeserializeOwned` for
///   cache storage and `Send + Sync + 'static` for async compatibility
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The remote collection this record type belongs to.
    fn collection() -> Collection;

    /// The current identifier for this record.
    fn record_id(&self) -> &str;

    /// Replace the identifier, used when a temp id resolves to a real one.
    fn set_record_id(&mut self, id: String);

    /// Client-generated correlation attribute established at create time.
    fn client_ref(&self) -> Option<&str> {
        None
    }
}
