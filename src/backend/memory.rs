//! Memory Backend Module
//!
//! In-process store with the same semantics as the HTTP backend. Used for
//! tests and for running the cache without a cluster.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::sync::RwLock;

use crate::backend::{KeyStream, KvBackend, StoredObject};
use crate::bucket::{BucketProps, Quorum};
use crate::error::{CacheError, Result};

// == Memory Backend ==
/// Buckets of objects held in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    /// Objects by bucket, then key
    buckets: RwLock<HashMap<String, HashMap<String, StoredObject>>>,
    /// Properties of buckets that have been configured
    props: RwLock<HashMap<String, BucketProps>>,
    /// Number of property updates received
    props_updates: AtomicUsize,
    fail_gets: AtomicBool,
    fail_puts: AtomicBool,
    fail_deletes: AtomicBool,
    fail_props: AtomicBool,
}

impl MemoryBackend {
    // == Constructor ==
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Properties reported for a bucket that was never configured.
    pub fn default_props() -> BucketProps {
        BucketProps {
            n_val: Some(3),
            r: Some(Quorum::Quorum),
            w: Some(Quorum::Quorum),
            dw: Some(Quorum::Quorum),
            rw: Some(Quorum::Quorum),
        }
    }

    /// Number of property updates applied so far.
    pub fn props_updates(&self) -> usize {
        self.props_updates.load(Ordering::SeqCst)
    }

    /// Number of objects stored in `bucket`.
    pub async fn len(&self, bucket: &str) -> usize {
        self.buckets
            .read()
            .await
            .get(bucket)
            .map_or(0, HashMap::len)
    }

    /// Makes every `get` fail with a request failure while set.
    pub fn fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    /// Makes every `put` fail with a request failure while set.
    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Makes every `delete` fail with a request failure while set.
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Makes both property calls fail with a request failure while set.
    pub fn fail_props(&self, fail: bool) {
        self.fail_props.store(fail, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, operation: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            Err(CacheError::request(
                Some(503),
                format!("{operation} unavailable"),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<StoredObject>> {
        Self::check(&self.fail_gets, "get")?;
        let buckets = self.buckets.read().await;
        Ok(buckets.get(bucket).and_then(|b| b.get(key)).cloned())
    }

    async fn put(&self, bucket: &str, key: &str, object: StoredObject) -> Result<()> {
        Self::check(&self.fail_puts, "put")?;
        let mut buckets = self.buckets.write().await;
        buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), object);
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        Self::check(&self.fail_deletes, "delete")?;
        let mut buckets = self.buckets.write().await;
        if let Some(objects) = buckets.get_mut(bucket) {
            objects.remove(key);
        }
        Ok(())
    }

    async fn list_keys(&self, bucket: &str) -> Result<KeyStream> {
        let keys: Vec<String> = self
            .buckets
            .read()
            .await
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default();

        Ok(stream::iter(keys.into_iter().map(Ok)).boxed())
    }

    async fn bucket_props(&self, bucket: &str) -> Result<BucketProps> {
        Self::check(&self.fail_props, "props")?;
        let props = self.props.read().await;
        Ok(props
            .get(bucket)
            .cloned()
            .unwrap_or_else(Self::default_props))
    }

    async fn set_bucket_props(&self, bucket: &str, update: &BucketProps) -> Result<()> {
        Self::check(&self.fail_props, "props")?;
        let mut props = self.props.write().await;
        props
            .entry(bucket.to_string())
            .or_insert_with(Self::default_props)
            .merge(update);
        self.props_updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    fn object(data: &str) -> StoredObject {
        StoredObject::new(data.as_bytes().to_vec(), "application/json")
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let backend = MemoryBackend::new();

        backend.put("b", "key1", object("1")).await.unwrap();

        assert_eq!(backend.get("b", "key1").await.unwrap(), Some(object("1")));
        assert_eq!(backend.len("b").await, 1);
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let backend = MemoryBackend::new();
        assert!(backend.get("b", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_buckets_are_separate() {
        let backend = MemoryBackend::new();

        backend.put("a", "key", object("1")).await.unwrap();

        assert!(backend.get("b", "key").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite() {
        let backend = MemoryBackend::new();

        backend.put("b", "key1", object("1")).await.unwrap();
        backend.put("b", "key1", object("2")).await.unwrap();

        assert_eq!(backend.get("b", "key1").await.unwrap(), Some(object("2")));
        assert_eq!(backend.len("b").await, 1);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let backend = MemoryBackend::new();

        backend.put("b", "key1", object("1")).await.unwrap();
        backend.delete("b", "key1").await.unwrap();
        backend.delete("b", "key1").await.unwrap();
        backend.delete("other", "key1").await.unwrap();

        assert!(backend.get("b", "key1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_keys() {
        let backend = MemoryBackend::new();
        backend.put("b", "x", object("1")).await.unwrap();
        backend.put("b", "y", object("2")).await.unwrap();

        let mut keys: Vec<String> = backend
            .list_keys("b")
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        keys.sort();

        assert_eq!(keys, vec!["x", "y"]);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let backend = MemoryBackend::new();
        backend.put("b", "k", object("1")).await.unwrap();
        backend.fail_gets(true);
        backend.fail_puts(true);
        backend.fail_deletes(true);

        assert!(backend.get("b", "k").await.unwrap_err().is_request_failure());
        assert!(backend
            .put("b", "k", object("2"))
            .await
            .unwrap_err()
            .is_request_failure());
        assert!(backend.delete("b", "k").await.unwrap_err().is_request_failure());

        backend.fail_gets(false);
        assert_eq!(backend.get("b", "k").await.unwrap(), Some(object("1")));
    }

    #[tokio::test]
    async fn test_props_start_at_store_defaults() {
        let backend = MemoryBackend::new();
        assert_eq!(
            backend.bucket_props("b").await.unwrap(),
            MemoryBackend::default_props()
        );
    }
}
