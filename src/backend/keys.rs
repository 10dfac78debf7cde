//! Streamed key listing.
//!
//! The store answers a streamed listing with a series of `{"keys":[...]}`
//! objects written back to back, split across chunks at arbitrary byte
//! boundaries.

use futures::stream::{self, StreamExt, TryStreamExt};
use futures::Stream;
use serde::Deserialize;

use crate::backend::KeyStream;
use crate::error::{CacheError, Result};

#[derive(Deserialize)]
struct KeysChunk {
    #[serde(default)]
    keys: Vec<String>,
}

// == Key Chunk Decoder ==
/// Incremental decoder that buffers a partial trailing object between chunks.
///
/// Each byte is scanned once for top-level object boundaries; only complete
/// objects are handed to serde_json.
#[derive(Debug, Default)]
pub(crate) struct KeyChunkDecoder {
    buf: Vec<u8>,
    /// Bytes of `buf` already scanned
    scanned: usize,
    /// Open braces and brackets at `scanned`
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl KeyChunkDecoder {
    /// Appends `bytes` and returns the keys of every object now complete.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<String>> {
        self.buf.extend_from_slice(bytes);

        let complete = self.scan()?;
        if complete == 0 {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for chunk in
            serde_json::Deserializer::from_slice(&self.buf[..complete]).into_iter::<KeysChunk>()
        {
            let chunk = chunk
                .map_err(|err| CacheError::Codec(format!("Malformed key listing: {err}")))?;
            keys.extend(chunk.keys);
        }

        self.buf.drain(..complete);
        self.scanned -= complete;
        Ok(keys)
    }

    /// Scans the new bytes and returns the end of the last complete object.
    fn scan(&mut self) -> Result<usize> {
        let start = self.scanned;
        let mut complete = 0;

        for (offset, &byte) in self.buf[start..].iter().enumerate() {
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if byte == b'\\' {
                    self.escaped = true;
                } else if byte == b'"' {
                    self.in_string = false;
                }
                continue;
            }

            match byte {
                b'"' if self.depth > 0 => self.in_string = true,
                b'{' => self.depth += 1,
                b'[' if self.depth > 0 => self.depth += 1,
                b'}' | b']' if self.depth > 0 => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        complete = start + offset + 1;
                    }
                }
                _ if self.depth > 0 || byte.is_ascii_whitespace() => {}
                _ => {
                    return Err(CacheError::Codec(format!(
                        "Malformed key listing: unexpected {:?} between objects",
                        char::from(byte)
                    )))
                }
            }
        }

        self.scanned = self.buf.len();
        Ok(complete)
    }

    /// Returns true if only whitespace is left over.
    pub fn is_drained(&self) -> bool {
        self.buf.iter().all(u8::is_ascii_whitespace)
    }
}

/// Turns a stream of response chunks into a stream of keys.
pub(crate) fn decode_key_stream<S, B>(chunks: S) -> KeyStream
where
    S: Stream<Item = Result<B>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let mut decoder = KeyChunkDecoder::default();

    chunks
        .map(Some)
        .chain(stream::once(async { None }))
        .map(move |chunk| match chunk {
            Some(bytes) => decoder.feed(bytes?.as_ref()),
            None => {
                if decoder.is_drained() {
                    Ok(Vec::new())
                } else {
                    Err(CacheError::Codec(
                        "Key listing ended mid-object".to_string(),
                    ))
                }
            }
        })
        .map_ok(|keys| stream::iter(keys.into_iter().map(Ok::<String, CacheError>)))
        .try_flatten()
        .boxed()
}
