//! LMDB-backed storage medium.
//!
//! Uses the heed crate (Rust bindings for LMDB) so cached entries
//! survive process restarts. A single unnamed database maps cache keys
//! to serialized entry JSON.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. Read transactions back `get` and
//! `list_keys`, write transactions back `set` and `delete`. Operations
//! are short and synchronous; they run inline on the async caller.

use std::path::Path;

use async_trait::async_trait;
use bazaar_core::CacheError;
use heed::types::Str;
use heed::{Database, Env, EnvOpenOptions};

use crate::medium::StorageMedium;

fn medium_err(e: impl std::fmt::Display) -> CacheError {
    CacheError::Medium {
        reason: e.to_string(),
    }
}

/// Persistent storage medium backed by an LMDB environment.
pub struct LmdbMedium {
    env: Env,
    db: Database<Str, Str>,
}

impl LmdbMedium {
    /// Open (or create) an LMDB environment at `path`.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, CacheError> {
        std::fs::create_dir_all(&path).map_err(medium_err)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(medium_err)?;

        let mut wtxn = env.write_txn().map_err(medium_err)?;
        let db: Database<Str, Str> = env.create_database(&mut wtxn, None).map_err(medium_err)?;
        wtxn.commit().map_err(medium_err)?;

        Ok(Self { env, db })
    }
}

#[async_trait]
impl StorageMedium for LmdbMedium {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let rtxn = self.env.read_txn().map_err(medium_err)?;
        let value = self.db.get(&rtxn, key).map_err(medium_err)?;
        Ok(value.map(|v| v.to_string()))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        let mut wtxn = self.env.write_txn().map_err(medium_err)?;
        self.db.put(&mut wtxn, key, &value).map_err(medium_err)?;
        wtxn.commit().map_err(medium_err)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut wtxn = self.env.write_txn().map_err(medium_err)?;
        self.db.delete(&mut wtxn, key).map_err(medium_err)?;
        wtxn.commit().map_err(medium_err)
    }

    async fn list_keys(&self) -> Result<Vec<String>, CacheError> {
        let rtxn = self.env.read_txn().map_err(medium_err)?;
        let iter = self.db.iter(&rtxn).map_err(medium_err)?;

        let mut keys = Vec::new();
        for result in iter {
            let (key, _) = result.map_err(medium_err)?;
            keys.push(key.to_string());
        }
        Ok(keys)
    }
}
