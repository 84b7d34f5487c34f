//! Bazaar Cache - Namespaced TTL Cache
//!
//! A client-resident cache with per-entry TTLs, a deterministic key
//! policy, pluggable storage mediums, and a stale-while-revalidate
//! read path with per-key request coalescing.
//!
//! # Architecture
//!
//! - `medium` / `lmdb`: the persistence seam. A [`StorageMedium`] is a
//!   dumb string-to-string map; the cache owns all TTL semantics.
//! - `entry`: the stored envelope (payload + stored_at + ttl).
//! - `key`: the cache key policy. Keys are only constructed through
//!   [`CacheKey`], never by hand-assembled strings.
//! - `store`: the TTL store. Best-effort by contract: a failing medium
//!   degrades to a miss, never an error.
//! - `refresher`: stale-while-revalidate reads with coalesced loads.

pub mod entry;
pub mod key;
pub mod lmdb;
pub mod medium;
pub mod refresher;
pub mod store;

pub use entry::CacheEntry;
pub use key::CacheKey;
pub use lmdb::LmdbMedium;
pub use medium::{InMemoryMedium, StorageMedium};
pub use refresher::{CacheConfig, CachedValue, ReadPolicy, Refresher, ValueSource};
pub use store::{CacheStore, EntryState};
