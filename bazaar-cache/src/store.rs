//! Namespaced TTL cache store.
//!
//! Wraps a [`StorageMedium`] with per-entry TTLs and a namespace
//! prefix so several stores can share one medium. Every operation is
//! best-effort: a failing medium degrades a read to a miss and a write
//! to a no-op, logged at debug. Callers never see a `CacheError`.

use std::sync::Arc;
use std::time::Duration;

use bazaar_core::Timestamp;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::entry::CacheEntry;
use crate::key::CacheKey;
use crate::medium::StorageMedium;

/// Result of a non-destructive [`CacheStore::lookup`].
///
/// Unlike `get`, a lookup never purges: the refresher needs to see an
/// expired entry so it can serve it as a degraded value when the remote
/// load fails.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryState<T> {
    /// Valid and not close to expiring.
    Fresh { data: T, stored_at: Timestamp },
    /// Valid but inside the near-expiry window.
    NearExpiry { data: T, stored_at: Timestamp },
    /// Present but past its TTL.
    Expired { data: T, stored_at: Timestamp },
    /// No entry stored, or the stored bytes were unreadable.
    Absent,
}

/// TTL cache over a shared storage medium.
///
/// Medium keys are `"{namespace}:{cache_key}"`, so distinct namespaces
/// never see each other's entries and `clear` only removes its own.
#[derive(Clone)]
pub struct CacheStore {
    namespace: String,
    medium: Arc<dyn StorageMedium>,
}

impl CacheStore {
    pub fn new(namespace: impl Into<String>, medium: Arc<dyn StorageMedium>) -> Self {
        Self {
            namespace: namespace.into(),
            medium,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn medium_key(&self, key: &CacheKey) -> String {
        format!("{}:{}", self.namespace, key)
    }

    /// Store a value under `key` with the given TTL, overwriting any
    /// previous entry. Medium or serialization failures are swallowed.
    pub async fn set<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        let entry = CacheEntry::new(value, Utc::now(), ttl);
        let raw = match entry.to_json() {
            Ok(raw) => raw,
            Err(e) => {
                debug!(key = %key, error = %e, "cache serialization failed, skipping write");
                return;
            }
        };
        if let Err(e) = self.medium.set(&self.medium_key(key), raw).await {
            debug!(key = %key, error = %e, "cache write failed, skipping");
        }
    }

    /// Read a value. Returns `None` on miss, unreadable bytes, medium
    /// failure, or expiry; an expired entry is purged before returning.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        match self.lookup(key, Duration::ZERO).await {
            EntryState::Fresh { data, .. } | EntryState::NearExpiry { data, .. } => Some(data),
            EntryState::Expired { .. } => {
                self.remove(key).await;
                None
            }
            EntryState::Absent => None,
        }
    }

    /// Classify the stored entry without purging anything.
    pub async fn lookup<T: DeserializeOwned>(
        &self,
        key: &CacheKey,
        near_window: Duration,
    ) -> EntryState<T> {
        let raw = match self.medium.get(&self.medium_key(key)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return EntryState::Absent,
            Err(e) => {
                debug!(key = %key, error = %e, "cache read failed, treating as miss");
                return EntryState::Absent;
            }
        };

        let entry: CacheEntry<T> = match CacheEntry::from_json(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(key = %key, error = %e, "cached entry unreadable, treating as miss");
                return EntryState::Absent;
            }
        };

        let now = Utc::now();
        if !entry.is_valid(now) {
            EntryState::Expired {
                data: entry.data,
                stored_at: entry.stored_at,
            }
        } else if entry.is_near_expiry(now, near_window) {
            EntryState::NearExpiry {
                data: entry.data,
                stored_at: entry.stored_at,
            }
        } else {
            EntryState::Fresh {
                data: entry.data,
                stored_at: entry.stored_at,
            }
        }
    }

    /// Remove one entry. Idempotent; absent keys and medium failures
    /// are both fine.
    pub async fn remove(&self, key: &CacheKey) {
        if let Err(e) = self.medium.delete(&self.medium_key(key)).await {
            debug!(key = %key, error = %e, "cache remove failed, skipping");
        }
    }

    /// Remove every entry whose cache key starts with `prefix`, at a
    /// segment boundary: a `"jobs"` prefix removes `"jobs:q:…"` keys
    /// but never `"jobs_archive:…"` keys. Idempotent; zero matches is
    /// not an error.
    pub async fn remove_by_prefix(&self, prefix: &str) {
        let mut full = format!("{}:{}", self.namespace, prefix);
        if !full.ends_with(':') {
            full.push(':');
        }
        self.remove_matching(|key| key.starts_with(&full)).await;
    }

    /// Remove every entry in this namespace, leaving other namespaces
    /// on the shared medium untouched.
    pub async fn clear(&self) {
        let ns_prefix = format!("{}:", self.namespace);
        self.remove_matching(|key| key.starts_with(&ns_prefix)).await;
    }

    async fn remove_matching(&self, matches: impl Fn(&str) -> bool) {
        let keys = match self.medium.list_keys().await {
            Ok(keys) => keys,
            Err(e) => {
                debug!(error = %e, "cache key listing failed, skipping bulk remove");
                return;
            }
        };
        for key in keys.iter().filter(|k| matches(k)) {
            if let Err(e) = self.medium.delete(key).await {
                debug!(key = %key, error = %e, "cache remove failed, skipping");
            }
        }
    }
}
