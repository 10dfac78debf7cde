//! Configuration Module
//!
//! Construction-time settings for the cache store: where the store lives and
//! how its bucket should be replicated.

use std::env;

use crate::backend::is_dot_segment;
use crate::bucket::{BucketProps, Quorum};
use crate::error::{CacheError, Result};

/// Cache client configuration parameters.
///
/// Passed by value to the store constructor; nothing here is global.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Base URL of the store's HTTP interface
    pub base_url: String,
    /// Bucket holding the cache entries
    pub bucket: String,
    /// Replication factor for the bucket
    pub n_value: u32,
    /// Read quorum
    pub r: Quorum,
    /// Write quorum
    pub w: Quorum,
    /// Durable write quorum
    pub dw: Quorum,
    /// Delete quorum
    pub rw: Quorum,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Client identity sent with every request
    pub client_id: Option<String>,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `RIAK_URL` - Base URL (default: http://127.0.0.1:8098)
    /// - `RIAK_CACHE_BUCKET` - Bucket name (default: _cache)
    /// - `RIAK_CACHE_N_VALUE` - Replication factor (default: 2)
    /// - `RIAK_CACHE_R` / `RIAK_CACHE_W` / `RIAK_CACHE_DW` / `RIAK_CACHE_RW` -
    ///   Quorum values, a count or one of one/quorum/all/default
    ///   (defaults: 1, 1, 0, quorum)
    /// - `RIAK_REQUEST_TIMEOUT` - Request timeout in seconds (default: 10)
    /// - `RIAK_CLIENT_ID` - Client identity (default: none)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env::var("RIAK_URL").unwrap_or(defaults.base_url),
            bucket: env::var("RIAK_CACHE_BUCKET").unwrap_or(defaults.bucket),
            n_value: parse_var("RIAK_CACHE_N_VALUE").unwrap_or(defaults.n_value),
            r: parse_var("RIAK_CACHE_R").unwrap_or(defaults.r),
            w: parse_var("RIAK_CACHE_W").unwrap_or(defaults.w),
            dw: parse_var("RIAK_CACHE_DW").unwrap_or(defaults.dw),
            rw: parse_var("RIAK_CACHE_RW").unwrap_or(defaults.rw),
            request_timeout_secs: parse_var("RIAK_REQUEST_TIMEOUT")
                .unwrap_or(defaults.request_timeout_secs),
            client_id: env::var("RIAK_CLIENT_ID").ok(),
        }
    }

    /// Checks the values the store would reject.
    pub fn validate(&self) -> Result<()> {
        if self.bucket.is_empty() {
            return Err(CacheError::InvalidConfig(
                "Bucket name cannot be empty".to_string(),
            ));
        }
        if is_dot_segment(&self.bucket) {
            return Err(CacheError::InvalidConfig(format!(
                "Bucket name {:?} cannot be addressed",
                self.bucket
            )));
        }
        if self.n_value == 0 {
            return Err(CacheError::InvalidConfig(
                "n_value must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The bucket properties this configuration asks for.
    pub fn desired_props(&self) -> BucketProps {
        BucketProps {
            n_val: Some(self.n_value),
            r: Some(self.r),
            w: Some(self.w),
            dw: Some(self.dw),
            rw: Some(self.rw),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8098".to_string(),
            bucket: "_cache".to_string(),
            n_value: 2,
            r: Quorum::Count(1),
            w: Quorum::Count(1),
            dw: Quorum::Count(0),
            rw: Quorum::Quorum,
            request_timeout_secs: 10,
            client_id: None,
        }
    }
}
