//! The stored cache envelope.

use std::time::Duration;

use bazaar_core::Timestamp;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A cached payload plus the metadata needed to judge its freshness.
///
/// Serialized as JSON into the storage medium. TTL is stored in whole
/// milliseconds so entries written by one session remain readable by
/// the next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    pub stored_at: Timestamp,
    ttl_ms: u64,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, stored_at: Timestamp, ttl: Duration) -> Self {
        Self {
            data,
            stored_at,
            ttl_ms: ttl.as_millis() as u64,
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Whether the entry has not outlived its TTL at `now`.
    ///
    /// A clock that moved backwards makes age negative; such entries
    /// count as valid rather than expiring everything at once.
    pub fn is_valid(&self, now: Timestamp) -> bool {
        let age = now.signed_duration_since(self.stored_at);
        match age.to_std() {
            Ok(age) => age <= self.ttl(),
            Err(_) => true,
        }
    }

    /// Valid, but within `window` of expiring.
    pub fn is_near_expiry(&self, now: Timestamp, window: Duration) -> bool {
        if !self.is_valid(now) {
            return false;
        }
        let age = now
            .signed_duration_since(self.stored_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        self.ttl().saturating_sub(age) <= window
    }
}

impl<T: Serialize> CacheEntry<T> {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl<T: DeserializeOwned> CacheEntry<T> {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
