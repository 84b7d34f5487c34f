//! Bazaar Core - Shared Data Types
//!
//! Pure data structures for the client-resident cache and optimistic
//! synchronization layer. No I/O lives here; the cache and sync crates
//! depend on these types.

pub mod collection;
pub mod error;
pub mod event;
pub mod filter;
pub mod identity;
pub mod record;

pub use collection::Collection;
pub use error::{BazaarError, BazaarResult, CacheError, RemoteError};
pub use event::{ChangeKind, RemoteChange};
pub use filter::Filter;
pub use identity::{is_temp_id, new_temp_id, RecordId, Timestamp};
pub use record::Record;
