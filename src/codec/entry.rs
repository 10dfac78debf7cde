//! Cache Entry Module
//!
//! The envelope every cached value is stored in, carrying its own expiry.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 9999-12-31T23:59:59Z, the last second with a four-digit RFC 3339 year.
const LATEST_EXPIRY_SECS: i64 = 253_402_300_799;

/// Latest expiry an envelope carries. Longer TTLs are capped here.
pub fn latest_expiry() -> DateTime<Utc> {
    DateTime::from_timestamp(LATEST_EXPIRY_SECS, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

// == Cache Entry ==
/// A cached value with its creation time and optional expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// When the entry was written
    pub created_at: DateTime<Utc>,
    /// When the entry stops being served, None = no expiration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates an entry that never expires.
    pub fn new(value: V) -> Self {
        Self {
            value,
            created_at: Utc::now(),
            expires_at: None,
        }
    }

    /// Creates an entry that expires `ttl` from now.
    ///
    /// An expiry past [`latest_expiry`] is capped there, so a huge TTL still
    /// yields an entry that expires, just far in the future.
    pub fn with_ttl(value: V, ttl: Duration) -> Self {
        let created_at = Utc::now();
        let latest = latest_expiry();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| created_at.checked_add_signed(ttl))
            .map_or(latest, |expires| expires.min(latest));

        Self {
            value,
            created_at,
            expires_at: Some(expires_at),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches its expiry.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|expires| Utc::now() >= expires)
    }

    // == Time To Live ==
    /// Returns the time left before expiry, or None if no expiration is set.
    ///
    /// Returns `Some(Duration::ZERO)` once the entry has expired.
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|expires| (expires - Utc::now()).to_std().unwrap_or(Duration::ZERO))
    }

    /// Replaces the value, keeping the expiry.
    pub fn replace<U>(self, value: U) -> CacheEntry<U> {
        CacheEntry {
            value,
            created_at: Utc::now(),
            expires_at: self.expires_at,
        }
    }
}
