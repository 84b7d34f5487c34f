//! Error types for Bazaar operations

use crate::Collection;
use thiserror::Error;

/// Cache medium and serialization errors.
///
/// These never cross the public cache boundary: the cache store degrades
/// a failing medium to a miss on read and a no-op on write. The type
/// exists for the `StorageMedium` seam and for logging.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache medium failure: {reason}")]
    Medium { reason: String },

    #[error("Cache serialization failure: {reason}")]
    Serialization { reason: String },
}

/// Remote store errors, surfaced to callers after rollback.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Network failure: {reason}")]
    Network { reason: String },

    #[error("Remote rejected the request with status {status}: {message}")]
    Rejected { status: i32, message: String },

    #[error("Record not found: {collection} with id {id}")]
    NotFound { collection: Collection, id: String },
}

/// Master error type for all Bazaar errors.
#[derive(Debug, Clone, Error)]
pub enum BazaarError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Patch error: {reason}")]
    Patch { reason: String },

    #[error("A mutation is already in flight for record {id}")]
    MutationInFlight { id: String },

    #[error("Record not present in the local view: {id}")]
    NotInView { id: String },
}

/// Result type alias for Bazaar operations.
pub type BazaarResult<T> = Result<T, BazaarError>;
