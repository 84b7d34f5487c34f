//! The remote managed store, as seen from the client.

use async_trait::async_trait;
use bazaar_core::{Filter, Record, RemoteError};

/// Request/response surface of the remote store for one record type.
///
/// Implementations wrap whatever transport the application uses. Pushed
/// changes arrive out-of-band through a channel consumed by
/// [`Reconciler::drive`](crate::Reconciler::drive), not through this
/// trait.
#[async_trait]
pub trait RemoteSource<T: Record>: Send + Sync {
    /// List records matching `filter`.
    async fn list(&self, filter: &Filter) -> Result<Vec<T>, RemoteError>;

    /// Fetch a single record. `Ok(None)` when the id does not exist.
    async fn get_by_id(&self, id: &str) -> Result<Option<T>, RemoteError>;

    /// Create a record and return the id the store assigned to it.
    /// The payload carries a temp id; the store ignores it.
    async fn create(&self, payload: &T) -> Result<String, RemoteError>;

    /// Apply a partial update. `patch` is a JSON object of changed fields.
    async fn update(&self, id: &str, patch: &serde_json::Value) -> Result<(), RemoteError>;

    /// Delete a record.
    async fn delete(&self, id: &str) -> Result<(), RemoteError>;
}
