//! Error types for the cache client
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache client.
///
/// Absence of a key is never an error; backend lookups return `Option`.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Network or server failure other than not-found
    #[error("Request failed{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    RequestFailed {
        status: Option<u16>,
        message: String,
    },

    /// The store holds sibling versions of the key
    #[error("Conflict on key {key}: {} siblings", .vtags.len())]
    Conflict { key: String, vtags: Vec<String> },

    /// Stored payload could not be encoded or decoded
    #[error("Codec error: {0}")]
    Codec(String),

    /// Key rejected before any request was issued
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Construction-time configuration is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CacheError {
    /// Builds a request failure from an HTTP status and message.
    pub fn request(status: Option<u16>, message: impl Into<String>) -> Self {
        CacheError::RequestFailed {
            status,
            message: message.into(),
        }
    }

    /// Returns true for failures reported by the backend or its transport.
    pub fn is_request_failure(&self) -> bool {
        matches!(
            self,
            CacheError::RequestFailed { .. } | CacheError::Conflict { .. }
        )
    }
}

impl From<reqwest::Error> for CacheError {
    fn from(err: reqwest::Error) -> Self {
        CacheError::RequestFailed {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Codec(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache client.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_failure_display_with_status() {
        let err = CacheError::request(Some(503), "service unavailable");
        assert_eq!(err.to_string(), "Request failed (503): service unavailable");
        assert!(err.is_request_failure());
    }

    #[test]
    fn test_request_failure_display_without_status() {
        let err = CacheError::request(None, "connection refused");
        assert_eq!(err.to_string(), "Request failed: connection refused");
    }

    #[test]
    fn test_conflict_is_request_failure() {
        let err = CacheError::Conflict {
            key: "k".to_string(),
            vtags: vec!["a".to_string(), "b".to_string()],
        };
        assert!(err.is_request_failure());
        assert_eq!(err.to_string(), "Conflict on key k: 2 siblings");
    }

    #[test]
    fn test_codec_error_is_not_request_failure() {
        let err: CacheError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, CacheError::Codec(_)));
        assert!(!err.is_request_failure());
    }
}
