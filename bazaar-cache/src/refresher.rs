//! Stale-while-revalidate read path with per-key request coalescing.
//!
//! The refresher sits between callers and the TTL store. Fresh entries
//! return immediately; near-expiry entries return immediately while a
//! single background refresh is spawned; misses trigger a foreground
//! load where one leader calls the loader and concurrent followers wait
//! on a `watch` channel, then re-read the cache.
//!
//! In-flight loads are tracked per medium key in a shared map. The map
//! is guarded by a `std::sync::Mutex` because no await happens while it
//! is held.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bazaar_core::{RemoteError, Timestamp};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use crate::key::CacheKey;
use crate::store::{CacheStore, EntryState};

/// Tuning knobs for the read path.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL applied when a read does not specify one.
    pub default_ttl: Duration,
    /// How close to expiry an entry must be before a read triggers a
    /// background refresh.
    pub near_expiry_window: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(300),
            near_expiry_window: Duration::from_secs(30),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default TTL.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Set the near-expiry window.
    pub fn with_near_expiry_window(mut self, window: Duration) -> Self {
        self.near_expiry_window = window;
        self
    }
}

/// How a read should treat cached data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPolicy {
    /// Serve from cache when fresh enough.
    Cached,
    /// Skip the freshness check and load, coalesced with any in-flight
    /// load for the same key.
    ForceRefresh,
}

/// Where a returned value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    /// Served from a valid cached entry.
    Hit,
    /// Fetched by the loader during this read.
    Loaded,
    /// The loader failed; this is a cached value that may be expired.
    Degraded,
}

/// A read result with its provenance.
#[derive(Debug, Clone)]
pub struct CachedValue<T> {
    pub value: T,
    pub source: ValueSource,
    /// When the value entered the cache. `None` for freshly loaded values.
    pub stored_at: Option<Timestamp>,
}

impl<T> CachedValue<T> {
    fn hit(value: T, stored_at: Timestamp) -> Self {
        Self {
            value,
            source: ValueSource::Hit,
            stored_at: Some(stored_at),
        }
    }

    fn loaded(value: T) -> Self {
        Self {
            value,
            source: ValueSource::Loaded,
            stored_at: None,
        }
    }

    fn degraded(value: T, stored_at: Timestamp) -> Self {
        Self {
            value,
            source: ValueSource::Degraded,
            stored_at: Some(stored_at),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.source == ValueSource::Degraded
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

type InflightMap = Arc<Mutex<HashMap<String, watch::Receiver<bool>>>>;

/// Read front-end for a [`CacheStore`].
#[derive(Clone)]
pub struct Refresher {
    store: CacheStore,
    config: CacheConfig,
    inflight: InflightMap,
}

enum LoadRole {
    /// This caller owns the load; the sender flips the channel when done.
    Leader(watch::Sender<bool>),
    /// Another caller is loading this key; wait on the receiver.
    Follower(watch::Receiver<bool>),
}

impl Refresher {
    pub fn new(store: CacheStore, config: CacheConfig) -> Self {
        Self {
            store,
            config,
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Read `key`, loading through `loader` as the policy and cache
    /// state require. The loader is called at most once per `read`.
    ///
    /// Errors surface only when the loader fails and nothing usable is
    /// cached; a stale entry downgrades the failure to a
    /// [`ValueSource::Degraded`] result.
    pub async fn read<T, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        policy: ReadPolicy,
        loader: F,
    ) -> Result<CachedValue<T>, RemoteError>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, RemoteError>> + Send + 'static,
    {
        self.read_with_ttl(key, ttl, policy, loader).await
    }

    /// [`read`](Self::read) with the config's default TTL and the
    /// `Cached` policy. The common call for feature code.
    pub async fn read_cached<T, F, Fut>(
        &self,
        key: &CacheKey,
        loader: F,
    ) -> Result<CachedValue<T>, RemoteError>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, RemoteError>> + Send + 'static,
    {
        self.read_with_ttl(key, self.config.default_ttl, ReadPolicy::Cached, loader)
            .await
    }

    async fn read_with_ttl<T, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        policy: ReadPolicy,
        loader: F,
    ) -> Result<CachedValue<T>, RemoteError>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, RemoteError>> + Send + 'static,
    {
        if policy == ReadPolicy::Cached {
            match self.store.lookup::<T>(key, self.config.near_expiry_window).await {
                EntryState::Fresh { data, stored_at } => {
                    return Ok(CachedValue::hit(data, stored_at));
                }
                EntryState::NearExpiry { data, stored_at } => {
                    self.spawn_refresh(key, ttl, loader);
                    return Ok(CachedValue::hit(data, stored_at));
                }
                EntryState::Expired { .. } | EntryState::Absent => {}
            }
        }

        self.load_coalesced(key, ttl, loader).await
    }

    /// Foreground load with per-key coalescing. One leader calls the
    /// loader; followers wait and re-read the cache.
    async fn load_coalesced<T, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        loader: F,
    ) -> Result<CachedValue<T>, RemoteError>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let mut loader = Some(loader);
        loop {
            match self.join_or_lead(key) {
                LoadRole::Follower(mut rx) => {
                    // Leader finished (or vanished) once this resolves
                    let _ = rx.wait_for(|done| *done).await;
                    match self.store.lookup::<T>(key, Duration::ZERO).await {
                        EntryState::Fresh { data, stored_at }
                        | EntryState::NearExpiry { data, stored_at } => {
                            return Ok(CachedValue::hit(data, stored_at));
                        }
                        // Leader failed; take the lead ourselves
                        EntryState::Expired { .. } | EntryState::Absent => continue,
                    }
                }
                LoadRole::Leader(tx) => {
                    let loader = match loader.take() {
                        Some(loader) => loader,
                        None => {
                            // This caller already spent its one load
                            self.finish_load(key, &tx);
                            return self.degraded_or(key, RemoteError::Network {
                                reason: "load already attempted".into(),
                            })
                            .await;
                        }
                    };

                    let result = loader().await;
                    match result {
                        Ok(value) => {
                            self.store.set(key, &value, ttl).await;
                            self.finish_load(key, &tx);
                            debug!(key = %key, "cache refreshed from remote");
                            return Ok(CachedValue::loaded(value));
                        }
                        Err(e) => {
                            self.finish_load(key, &tx);
                            debug!(key = %key, error = %e, "remote load failed");
                            return self.degraded_or(key, e).await;
                        }
                    }
                }
            }
        }
    }

    /// Register interest in a key: become the leader if nobody is
    /// loading it, otherwise get the current leader's channel.
    fn join_or_lead(&self, key: &CacheKey) -> LoadRole {
        let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(rx) = inflight.get(key.as_str()) {
            LoadRole::Follower(rx.clone())
        } else {
            let (tx, rx) = watch::channel(false);
            inflight.insert(key.as_str().to_string(), rx);
            LoadRole::Leader(tx)
        }
    }

    /// Drop the in-flight marker and wake followers. Order matters:
    /// the cache write must already be visible before followers wake.
    fn finish_load(&self, key: &CacheKey, tx: &watch::Sender<bool>) {
        let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
        inflight.remove(key.as_str());
        drop(inflight);
        let _ = tx.send(true);
    }

    /// Fall back to whatever is cached, however stale; otherwise
    /// surface the remote error.
    async fn degraded_or<T: DeserializeOwned>(
        &self,
        key: &CacheKey,
        err: RemoteError,
    ) -> Result<CachedValue<T>, RemoteError> {
        match self.store.lookup::<T>(key, Duration::ZERO).await {
            EntryState::Fresh { data, stored_at }
            | EntryState::NearExpiry { data, stored_at }
            | EntryState::Expired { data, stored_at } => {
                debug!(key = %key, "serving degraded cached value after load failure");
                Ok(CachedValue::degraded(data, stored_at))
            }
            EntryState::Absent => Err(err),
        }
    }

    /// Spawn at most one background refresh for a near-expiry key.
    /// Callers holding a still-valid value do not wait on it.
    fn spawn_refresh<T, F, Fut>(&self, key: &CacheKey, ttl: Duration, loader: F)
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, RemoteError>> + Send + 'static,
    {
        let tx = match self.join_or_lead(key) {
            LoadRole::Leader(tx) => tx,
            // Someone is already refreshing this key
            LoadRole::Follower(_) => return,
        };

        let this = self.clone();
        let key = key.clone();
        tokio::spawn(async move {
            match loader().await {
                Ok(value) => {
                    this.store.set(&key, &value, ttl).await;
                    debug!(key = %key, "background refresh completed");
                }
                Err(e) => {
                    debug!(key = %key, error = %e, "background refresh failed");
                }
            }
            this.finish_load(&key, &tx);
        });
    }
}
