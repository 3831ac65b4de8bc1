//! Removal of versioned buckets: every object version and delete marker
//! goes first, then the bucket itself.

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

/// Most keys a single multi-object delete accepts.
pub const MAX_DELETE_BATCH: usize = 1000;

#[async_trait]
pub trait BucketApi: Send + Sync {
    /// One page of object versions and delete markers, starting after `marker`.
    async fn list_object_versions(
        &self,
        bucket: &str,
        marker: Option<PageMarker>,
    ) -> Result<VersionPage>;

    /// Delete `objects`, returning the ones the service refused.
    async fn delete_objects(
        &self,
        bucket: &str,
        objects: Vec<ObjectKey>,
    ) -> Result<Vec<DeleteFailure>>;

    async fn delete_bucket(&self, bucket: &str) -> Result<()>;
}

/// A single object version or delete marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKey {
    pub key: String,
    pub version_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMarker {
    pub key_marker: Option<String>,
    pub version_id_marker: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionPage {
    pub objects: Vec<ObjectKey>,
    /// Where the next page starts; `None` on the last page.
    pub next: Option<PageMarker>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFailure {
    pub key: String,
    pub version_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BucketError {
    #[error("{count} object versions could not be deleted from {bucket}, first {key}: {message}")]
    DeleteFailed {
        bucket: String,
        count: usize,
        key: String,
        message: String,
    },
}

/// Delete every object version in `bucket`, then the bucket.
/// Returns the number of versions and delete markers removed.
pub async fn purge_bucket(api: &impl BucketApi, bucket: &str) -> Result<usize> {
    let mut deleted = 0;
    let mut marker = None;
    loop {
        let page = api.list_object_versions(bucket, marker).await?;
        debug!(bucket, count = page.objects.len(), "listed object versions");
        for batch in page.objects.chunks(MAX_DELETE_BATCH) {
            let failures = api.delete_objects(bucket, batch.to_vec()).await?;
            if let Some(first) = failures.first() {
                return Err(BucketError::DeleteFailed {
                    bucket: bucket.to_string(),
                    count: failures.len(),
                    key: first.key.clone(),
                    message: first.message.clone(),
                }
                .into());
            }
            deleted += batch.len();
        }
        match page.next {
            Some(next) => marker = Some(next),
            None => break,
        }
    }
    api.delete_bucket(bucket).await?;
    info!(bucket, deleted, "deleted bucket");
    Ok(deleted)
}
