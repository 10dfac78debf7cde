//! Backend Module
//!
//! The key-value operations the cache needs from a remote store, and the
//! implementations of them.

mod http;
mod keys;
mod memory;

pub use http::RiakHttpClient;
pub use memory::MemoryBackend;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::bucket::BucketProps;
use crate::error::Result;

/// Lazy, finite sequence of keys from one listing. Listing again starts over.
pub type KeyStream = BoxStream<'static, Result<String>>;

/// Returns true for names that cannot travel as a URL path segment.
///
/// URL normalization resolves `.` and `..` away, percent-encoded or not, so
/// an object under such a key is unreachable over HTTP.
pub(crate) fn is_dot_segment(name: &str) -> bool {
    matches!(name, "." | "..")
}

// == Stored Object ==
/// A serialized value as held by the store, tagged with its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Serialized payload
    pub data: Vec<u8>,
    /// Media type describing `data`
    pub content_type: String,
}

impl StoredObject {
    pub fn new(data: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            data,
            content_type: content_type.into(),
        }
    }
}

// == Backend Trait ==
/// Bucket and object operations against a key-value store.
///
/// Replication and quorum handling live in the store; implementations only
/// pass the configured values along.
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Fetches an object. `Ok(None)` means the key does not exist.
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<StoredObject>>;

    /// Stores an object, replacing any previous value.
    async fn put(&self, bucket: &str, key: &str, object: StoredObject) -> Result<()>;

    /// Removes an object. Removing a missing key succeeds.
    async fn delete(&self, bucket: &str, key: &str) -> Result<()>;

    /// Lists every key in the bucket.
    async fn list_keys(&self, bucket: &str) -> Result<KeyStream>;

    /// Reads the bucket's live properties.
    async fn bucket_props(&self, bucket: &str) -> Result<BucketProps>;

    /// Updates the properties that are set in `props`.
    async fn set_bucket_props(&self, bucket: &str, props: &BucketProps) -> Result<()>;
}
