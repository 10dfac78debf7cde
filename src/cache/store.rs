//! Cache Store Module
//!
//! The cache facade: typed reads and writes of enveloped values over a
//! key-value backend.

use std::time::Duration;

use futures::TryStreamExt;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backend::{is_dot_segment, KvBackend, RiakHttpClient};
use crate::bucket::ensure_properties;
use crate::codec::{self, CacheEntry};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

// == Cache Store ==
/// Cache backed by one bucket of a key-value store.
///
/// Every call issues its backend requests one at a time. Handles can be shared
/// across tasks; the store is the only shared state.
#[derive(Debug)]
pub struct RiakCacheStore<B = RiakHttpClient> {
    backend: B,
    bucket: String,
}

impl RiakCacheStore<RiakHttpClient> {
    /// Connects to the store described by `config` over HTTP.
    ///
    /// Fails only on invalid configuration; see [`RiakCacheStore::with_backend`].
    pub async fn connect(config: &CacheConfig) -> Result<Self> {
        let backend = RiakHttpClient::new(config)?;
        Self::with_backend(backend, config).await
    }
}

impl<B: KvBackend> RiakCacheStore<B> {
    // == Constructor ==
    /// Creates a store on `backend` and converges the bucket's properties.
    ///
    /// A failure to read or update the bucket properties is logged and
    /// otherwise ignored; the store is usable either way.
    pub async fn with_backend(backend: B, config: &CacheConfig) -> Result<Self> {
        config.validate()?;

        if let Err(err) = ensure_properties(&backend, &config.bucket, &config.desired_props()).await
        {
            warn!(
                bucket = %config.bucket,
                error = %err,
                "Could not apply bucket properties, continuing with the store's settings"
            );
        }

        Ok(Self {
            backend,
            bucket: config.bucket.clone(),
        })
    }

    /// Name of the bucket holding the entries.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The backend this store talks to.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    // == Read ==
    /// Reads the value stored under `key`.
    ///
    /// Returns `Ok(None)` if the key is missing or its entry has expired;
    /// expired entries are deleted. Request and decode failures propagate.
    pub async fn read<V: DeserializeOwned>(&self, key: &str) -> Result<Option<V>> {
        let Some(entry) = self.read_entry::<V>(key).await? else {
            return Ok(None);
        };

        if entry.is_expired() {
            debug!(key, "Entry expired, deleting");
            self.erase(key).await?;
            return Ok(None);
        }

        Ok(Some(entry.value))
    }

    /// Reads the full envelope under `key` without checking its expiry.
    pub async fn read_entry<V: DeserializeOwned>(&self, key: &str) -> Result<Option<CacheEntry<V>>> {
        validate_key(key)?;
        match self.backend.get(&self.bucket, key).await? {
            Some(object) => Ok(Some(codec::decode(&object)?)),
            None => Ok(None),
        }
    }

    // == Write ==
    /// Stores `value` under `key` with no expiry, replacing any previous value.
    pub async fn write<V: Serialize>(&self, key: &str, value: &V) -> Result<()> {
        self.write_entry(key, &CacheEntry::new(value)).await
    }

    /// Stores `value` under `key`; reads stop returning it after `ttl`.
    pub async fn write_with_ttl<V: Serialize>(
        &self,
        key: &str,
        value: &V,
        ttl: Duration,
    ) -> Result<()> {
        self.write_entry(key, &CacheEntry::with_ttl(value, ttl)).await
    }

    async fn write_entry<V: Serialize>(&self, key: &str, entry: &CacheEntry<V>) -> Result<()> {
        validate_key(key)?;
        let object = codec::encode(entry)?;
        self.backend.put(&self.bucket, key, object).await
    }

    // == Erase ==
    /// Deletes `key`. Deleting a missing key succeeds.
    pub async fn erase(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.backend.delete(&self.bucket, key).await
    }

    /// Deletes every key matching `pattern` and returns how many were deleted.
    ///
    /// Keys are matched while the listing streams in. This is not atomic:
    /// keys written during the sweep may or may not be removed. Listed keys
    /// that cannot be addressed (`.` and `..`) are skipped. The first failed
    /// delete stops the sweep.
    pub async fn erase_matching(&self, pattern: &Regex) -> Result<usize> {
        let mut keys = self.backend.list_keys(&self.bucket).await?;
        let mut deleted = 0;

        while let Some(key) = keys.try_next().await? {
            if !pattern.is_match(&key) {
                continue;
            }
            if is_dot_segment(&key) {
                warn!(bucket = %self.bucket, key, "Skipping key that cannot be addressed");
                continue;
            }
            self.backend.delete(&self.bucket, &key).await?;
            deleted += 1;
        }

        info!(bucket = %self.bucket, pattern = %pattern, deleted, "Deleted matching keys");
        Ok(deleted)
    }

    // == Counters ==
    /// Adds `amount` to the integer stored under `key` and returns the result.
    ///
    /// Returns `None` without writing if the key is missing, expired, not an
    /// integer, would overflow, or if any request fails. This is a plain
    /// read-modify-write: concurrent increments of one key can lose updates.
    pub async fn increment(&self, key: &str, amount: i64) -> Option<i64> {
        self.modify_value(key, |current| current.checked_add(amount)).await
    }

    /// Subtracts `amount` from the integer stored under `key`.
    ///
    /// Same rules as [`RiakCacheStore::increment`].
    pub async fn decrement(&self, key: &str, amount: i64) -> Option<i64> {
        self.modify_value(key, |current| current.checked_sub(amount)).await
    }

    async fn modify_value<F>(&self, key: &str, op: F) -> Option<i64>
    where
        F: FnOnce(i64) -> Option<i64>,
    {
        match self.try_modify_value(key, op).await {
            Ok(value) => value,
            Err(err) => {
                debug!(key, error = %err, "Counter update skipped");
                None
            }
        }
    }

    async fn try_modify_value<F>(&self, key: &str, op: F) -> Result<Option<i64>>
    where
        F: FnOnce(i64) -> Option<i64>,
    {
        let Some(entry) = self.read_entry::<i64>(key).await? else {
            return Ok(None);
        };
        if entry.is_expired() {
            return Ok(None);
        }
        let Some(updated) = op(entry.value) else {
            return Ok(None);
        };

        self.write_entry(key, &entry.replace(updated)).await?;
        Ok(Some(updated))
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("Key cannot be empty".to_string()));
    }
    if is_dot_segment(key) {
        return Err(CacheError::InvalidKey(format!(
            "Key {key:?} is a path dot segment"
        )));
    }
    Ok(())
}
