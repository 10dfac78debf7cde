//! Codec Module
//!
//! Serializes cache entries into tagged payloads for the store and back.

mod entry;

pub use entry::{latest_expiry, CacheEntry};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::backend::StoredObject;
use crate::error::{CacheError, Result};

/// Content type of every payload this crate writes.
pub const CONTENT_TYPE_JSON: &str = "application/json";

// == Encode ==
/// Serializes an entry into a JSON payload tagged `application/json`.
pub fn encode<V: Serialize>(entry: &CacheEntry<V>) -> Result<StoredObject> {
    let data = serde_json::to_vec(entry)?;
    Ok(StoredObject::new(data, CONTENT_TYPE_JSON))
}

// == Decode ==
/// Deserializes a payload written by [`encode`].
///
/// Media-type parameters such as `charset` are ignored; any other content
/// type is rejected.
pub fn decode<V: DeserializeOwned>(object: &StoredObject) -> Result<CacheEntry<V>> {
    let media_type = object
        .content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim();

    if !media_type.eq_ignore_ascii_case(CONTENT_TYPE_JSON) {
        return Err(CacheError::Codec(format!(
            "Unsupported content type: {}",
            object.content_type
        )));
    }

    Ok(serde_json::from_slice(&object.data)?)
}
