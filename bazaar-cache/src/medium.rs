//! Storage medium seam for the cache.
//!
//! A medium is a plain string-to-string map with no TTL knowledge; the
//! cache store layers expiry and namespacing on top. Implementations
//! must tolerate concurrent callers.

use std::collections::HashMap;

use async_trait::async_trait;
use bazaar_core::CacheError;
use tokio::sync::RwLock;

/// Persistence seam for cached entries.
///
/// Keys are opaque strings assembled by the cache store; values are
/// serialized [`CacheEntry`](crate::CacheEntry) JSON. Mediums never
/// interpret either.
#[async_trait]
pub trait StorageMedium: Send + Sync {
    /// Read a raw value. `Ok(None)` on absence.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Write a raw value, overwriting any existing one.
    async fn set(&self, key: &str, value: String) -> Result<(), CacheError>;

    /// Remove a key. Absent keys are not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// All stored keys, in no particular order.
    async fn list_keys(&self) -> Result<Vec<String>, CacheError>;
}

/// Process-local medium backed by a map. The default for tests and for
/// sessions that do not need persistence across restarts.
#[derive(Debug, Default)]
pub struct InMemoryMedium {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries. Test helper.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl StorageMedium for InMemoryMedium {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let medium = InMemoryMedium::new();

        medium.set("a", "1".into()).await.unwrap();
        assert_eq!(medium.get("a").await.unwrap(), Some("1".to_string()));

        medium.set("a", "2".into()).await.unwrap();
        assert_eq!(medium.get("a").await.unwrap(), Some("2".to_string()));

        medium.delete("a").await.unwrap();
        assert_eq!(medium.get("a").await.unwrap(), None);

        // Deleting an absent key is fine
        medium.delete("a").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_keys() {
        let medium = InMemoryMedium::new();
        medium.set("x", "1".into()).await.unwrap();
        medium.set("y", "2".into()).await.unwrap();

        let mut keys = medium.list_keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["x", "y"]);
    }
}
