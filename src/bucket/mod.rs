//! Bucket Module
//!
//! Converges a bucket's replication properties to the configured values.

mod props;

pub use props::{BucketProps, Quorum};
pub(crate) use props::PropsEnvelope;

use tracing::{debug, info};

use crate::backend::KvBackend;
use crate::error::Result;

// == Ensure Properties ==
/// Brings the live properties of `bucket` in line with `desired`.
///
/// Only the properties that differ are sent, in a single update. Returns the
/// applied diff, or `None` if the bucket had already converged.
///
/// Errors are returned to the caller; the cache store treats them as
/// non-fatal.
pub async fn ensure_properties<B>(
    backend: &B,
    bucket: &str,
    desired: &BucketProps,
) -> Result<Option<BucketProps>>
where
    B: KvBackend + ?Sized,
{
    let live = backend.bucket_props(bucket).await?;
    let diff = desired.diff(&live);

    if diff.is_empty() {
        debug!(bucket, "Bucket properties already converged");
        return Ok(None);
    }

    backend.set_bucket_props(bucket, &diff).await?;
    info!(bucket, ?diff, "Updated bucket properties");
    Ok(Some(diff))
}
