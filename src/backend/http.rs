//! HTTP Backend Module
//!
//! Talks to the store's HTTP interface with reqwest.

use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode, Url};
use tracing::debug;

use crate::backend::keys::decode_key_stream;
use crate::backend::{is_dot_segment, KeyStream, KvBackend, StoredObject};
use crate::bucket::{BucketProps, PropsEnvelope, Quorum};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

/// Header carrying the client identity used for vector clocks.
const CLIENT_ID_HEADER: &str = "x-riak-clientid";

/// Content type assumed when the store omits one.
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Longest slice of an error body kept in a failure message.
const MAX_ERROR_BODY: usize = 512;

// == Riak HTTP Client ==
/// Backend speaking the store's HTTP protocol.
#[derive(Debug, Clone)]
pub struct RiakHttpClient {
    http: Client,
    base_url: Url,
    r: Quorum,
    w: Quorum,
    dw: Quorum,
    rw: Quorum,
}

impl RiakHttpClient {
    // == Constructor ==
    /// Builds a client for the endpoint and quorum values in `config`.
    pub fn new(config: &CacheConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| CacheError::InvalidConfig(format!("Bad base URL {}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(CacheError::InvalidConfig(format!(
                "Base URL cannot carry a path: {}",
                config.base_url
            )));
        }

        let mut headers = HeaderMap::new();
        if let Some(client_id) = &config.client_id {
            let value = HeaderValue::from_str(client_id)
                .map_err(|e| CacheError::InvalidConfig(format!("Bad client id: {e}")))?;
            headers.insert(CLIENT_ID_HEADER, value);
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| CacheError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            r: config.r,
            w: config.w,
            dw: config.dw,
            rw: config.rw,
        })
    }

    /// Appends percent-encoded path segments to the base URL.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// URL of one object. Keys that are dot segments have no URL.
    fn object_url(&self, bucket: &str, key: &str) -> Result<Url> {
        if is_dot_segment(key) {
            return Err(CacheError::InvalidKey(format!(
                "Key {key:?} cannot be addressed over HTTP"
            )));
        }
        Ok(self.url(&["buckets", bucket, "keys", key]))
    }

    fn props_url(&self, bucket: &str) -> Url {
        self.url(&["buckets", bucket, "props"])
    }

    /// Turns an unexpected response into a request failure.
    async fn failure(response: Response) -> CacheError {
        let status = response.status();
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut end = MAX_ERROR_BODY;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            body.truncate(end);
        }
        CacheError::request(Some(status.as_u16()), format!("{status} {}", body.trim()))
    }
}

/// Reads the vtags out of a `300 Multiple Choices` body.
fn parse_siblings(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.eq_ignore_ascii_case("siblings:"))
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl KvBackend for RiakHttpClient {
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<StoredObject>> {
        debug!(bucket, key, "GET object");
        let response = self
            .http
            .get(self.object_url(bucket, key)?)
            .query(&[("r", self.r.to_string())])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or(FALLBACK_CONTENT_TYPE)
                    .to_string();
                let data = response.bytes().await?.to_vec();
                Ok(Some(StoredObject::new(data, content_type)))
            }
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::MULTIPLE_CHOICES => {
                let body = response.text().await?;
                Err(CacheError::Conflict {
                    key: key.to_string(),
                    vtags: parse_siblings(&body),
                })
            }
            _ => Err(Self::failure(response).await),
        }
    }

    async fn put(&self, bucket: &str, key: &str, object: StoredObject) -> Result<()> {
        debug!(bucket, key, bytes = object.data.len(), "PUT object");
        let response = self
            .http
            .put(self.object_url(bucket, key)?)
            .query(&[
                ("w", self.w.to_string()),
                ("dw", self.dw.to_string()),
                ("returnbody", "false".to_string()),
            ])
            .header(CONTENT_TYPE, object.content_type)
            .body(object.data)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT => Ok(()),
            _ => Err(Self::failure(response).await),
        }
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        debug!(bucket, key, "DELETE object");
        let response = self
            .http
            .delete(self.object_url(bucket, key)?)
            .query(&[("rw", self.rw.to_string())])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => Ok(()),
            _ => Err(Self::failure(response).await),
        }
    }

    async fn list_keys(&self, bucket: &str) -> Result<KeyStream> {
        debug!(bucket, "Streaming key list");
        let response = self
            .http
            .get(self.url(&["buckets", bucket, "keys"]))
            .query(&[("keys", "stream"), ("props", "false")])
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(Self::failure(response).await);
        }

        Ok(decode_key_stream(
            response.bytes_stream().map_err(CacheError::from),
        ))
    }

    async fn bucket_props(&self, bucket: &str) -> Result<BucketProps> {
        let response = self.http.get(self.props_url(bucket)).send().await?;
        if response.status() != StatusCode::OK {
            return Err(Self::failure(response).await);
        }

        let envelope: PropsEnvelope = response.json().await?;
        Ok(envelope.props)
    }

    async fn set_bucket_props(&self, bucket: &str, props: &BucketProps) -> Result<()> {
        let response = self
            .http
            .put(self.props_url(bucket))
            .json(&PropsEnvelope {
                props: props.clone(),
            })
            .send()
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
            _ => Err(Self::failure(response).await),
        }
    }
}
