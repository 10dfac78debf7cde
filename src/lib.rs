//! Riak Cache - A cache store backed by a distributed key-value database
//!
//! Stores enveloped values in one bucket of a Riak-style store over its HTTP
//! interface. Replication, quorums and conflict handling are left to the store;
//! this crate maps the cache operations and the bucket's replication settings
//! onto it.

pub mod backend;
pub mod bucket;
pub mod cache;
pub mod codec;
pub mod config;
pub mod error;

pub use backend::{KvBackend, MemoryBackend, RiakHttpClient};
pub use cache::RiakCacheStore;
pub use config::CacheConfig;
pub use error::{CacheError, Result};
