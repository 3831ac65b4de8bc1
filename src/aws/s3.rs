use anyhow::Result;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3 as s3;
use aws_types::region::Region;
use s3::types::{self, Delete, ObjectIdentifier};
use tracing::debug;

use super::required;
use crate::s3::{BucketApi, DeleteFailure, ObjectKey, PageMarker, VersionPage};

pub struct S3Buckets {
    client: s3::Client,
}

impl S3Buckets {
    pub fn new(sdk_config: &SdkConfig, region: Option<Region>) -> Self {
        let config = s3::config::Builder::from(sdk_config).region(region).build();
        Self {
            client: s3::Client::from_conf(config),
        }
    }
}

#[async_trait]
impl BucketApi for S3Buckets {
    async fn list_object_versions(
        &self,
        bucket: &str,
        marker: Option<PageMarker>,
    ) -> Result<VersionPage> {
        let (key_marker, version_id_marker) = marker
            .map(|m| (m.key_marker, m.version_id_marker))
            .unwrap_or_default();
        debug!(bucket, ?key_marker, "list object versions");
        let res = self
            .client
            .list_object_versions()
            .bucket(bucket)
            .set_key_marker(key_marker)
            .set_version_id_marker(version_id_marker)
            .send()
            .await?;

        let versions = res
            .versions()
            .into_iter()
            .flatten()
            .map(|v| object_key(v.key(), v.version_id()));
        let markers = res
            .delete_markers()
            .into_iter()
            .flatten()
            .map(|m| object_key(m.key(), m.version_id()));
        let objects = versions.chain(markers).collect::<Result<_>>()?;

        let next = res.is_truncated().then(|| PageMarker {
            key_marker: res.next_key_marker().map(String::from),
            version_id_marker: res.next_version_id_marker().map(String::from),
        });
        Ok(VersionPage { objects, next })
    }

    async fn delete_objects(
        &self,
        bucket: &str,
        objects: Vec<ObjectKey>,
    ) -> Result<Vec<DeleteFailure>> {
        let delete = Delete::builder()
            .set_objects(Some(objects.iter().map(to_object_identifier).collect()))
            .quiet(true)
            .build();
        let res = self
            .client
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await?;
        Ok(res.errors().into_iter().flatten().map(to_failure).collect())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        self.client.delete_bucket().bucket(bucket).send().await?;
        Ok(())
    }
}

fn object_key(key: Option<&str>, version_id: Option<&str>) -> Result<ObjectKey> {
    Ok(ObjectKey {
        key: required(key, "object key")?,
        version_id: version_id.map(String::from),
    })
}

fn to_object_identifier(object: &ObjectKey) -> ObjectIdentifier {
    ObjectIdentifier::builder()
        .key(&object.key)
        .set_version_id(object.version_id.clone())
        .build()
}

fn to_failure(error: &types::Error) -> DeleteFailure {
    DeleteFailure {
        key: error.key().unwrap_or_default().to_string(),
        version_id: error.version_id().map(String::from),
        message: error
            .message()
            .or(error.code())
            .unwrap_or("unknown error")
            .to_string(),
    }
}
