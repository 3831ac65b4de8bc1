use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_route53 as route53;
use route53::types::{self, ResourceRecord, ResourceRecordSet, RrType};
use tracing::debug;

use super::required;
use crate::dns::{ChangeInfo, ChangeSet, DnsApi, HostedZone, RecordSet};

pub struct Route53Dns {
    client: route53::Client,
}

impl Route53Dns {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: route53::Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl DnsApi for Route53Dns {
    async fn list_hosted_zones(&self) -> Result<Vec<HostedZone>> {
        let res = self.client.list_hosted_zones().send().await?;
        res.hosted_zones()
            .into_iter()
            .flatten()
            .map(|zone| {
                Ok(HostedZone {
                    name: required(zone.name(), "hosted zone name")?,
                    id: required(zone.id(), "hosted zone id")?,
                })
            })
            .collect()
    }

    async fn list_record_sets(&self, zone_id: &str) -> Result<Vec<RecordSet>> {
        debug!(zone_id, "list record sets");
        let res = self
            .client
            .list_resource_record_sets()
            .hosted_zone_id(zone_id)
            .send()
            .await?;
        res.resource_record_sets()
            .into_iter()
            .flatten()
            .map(to_record_set)
            .collect()
    }

    async fn change_record_sets(&self, zone_id: &str, changes: &ChangeSet) -> Result<ChangeInfo> {
        let res = self
            .client
            .change_resource_record_sets()
            .hosted_zone_id(zone_id)
            .change_batch(to_change_batch(changes))
            .send()
            .await?;
        let info = res
            .change_info()
            .with_context(|| format!("no change info returned for zone {zone_id}"))?;
        Ok(ChangeInfo {
            id: required(info.id(), "change id")?,
            status: info
                .status()
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
        })
    }
}

fn to_record_set(record: &ResourceRecordSet) -> Result<RecordSet> {
    Ok(RecordSet {
        name: required(record.name(), "record set name")?,
        record_type: record
            .r#type()
            .map(|t| t.as_str().to_string())
            .unwrap_or_default(),
        ttl: record.ttl(),
        values: record
            .resource_records()
            .into_iter()
            .flatten()
            .filter_map(|r| r.value())
            .map(String::from)
            .collect(),
        upstream: Some(record.clone()),
    })
}

/// Listed records go back exactly as listed; new records are built from their fields.
fn to_resource_record_set(record: &RecordSet) -> ResourceRecordSet {
    if let Some(upstream) = &record.upstream {
        return upstream.clone();
    }
    let values: Vec<_> = record
        .values
        .iter()
        .map(|v| ResourceRecord::builder().value(v).build())
        .collect();
    ResourceRecordSet::builder()
        .name(&record.name)
        .r#type(RrType::from(record.record_type.as_str()))
        .set_ttl(record.ttl)
        .set_resource_records((!values.is_empty()).then_some(values))
        .build()
}

fn to_change_batch(change_set: &ChangeSet) -> types::ChangeBatch {
    let changes = change_set
        .changes
        .iter()
        .map(|change| {
            types::Change::builder()
                .action(types::ChangeAction::from(change.action.as_str()))
                .resource_record_set(to_resource_record_set(&change.resource_record_set))
                .build()
        })
        .collect();
    types::ChangeBatch::builder()
        .comment(&change_set.comment)
        .set_changes(Some(changes))
        .build()
}
