//! CNAME record maintenance on top of a hosted-zone API.

use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_route53::types::ResourceRecordSet;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

/// TTL, in seconds, of the CNAME records this module creates.
pub const CNAME_TTL: i64 = 60;

#[async_trait]
pub trait DnsApi: Send + Sync {
    async fn list_hosted_zones(&self) -> Result<Vec<HostedZone>>;

    async fn list_record_sets(&self, zone_id: &str) -> Result<Vec<RecordSet>>;

    async fn change_record_sets(&self, zone_id: &str, changes: &ChangeSet) -> Result<ChangeInfo>;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DnsError {
    #[error("no hosted zone found for domain: {0}")]
    ZoneNotFound(String),

    #[error("record not found for hostname: {0}")]
    RecordNotFound(String),
}

/// Hosted zone as reported by the API: fully qualified name, `/hostedzone/<id>` id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedZone {
    pub name: String,
    pub id: String,
}

/// Hosted zone with the trailing dot and the id prefix stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Zone {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecordSet {
    pub name: String,
    #[serde(rename = "Type")]
    pub record_type: String,
    #[serde(rename = "TTL", skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
    #[serde(rename = "ResourceRecords")]
    pub values: Vec<String>,
    /// The record exactly as listed; sent back unchanged when the record is deleted.
    #[serde(skip)]
    pub upstream: Option<ResourceRecordSet>,
}

impl RecordSet {
    pub fn cname(hostname: &str, target: &str) -> Self {
        Self {
            name: hostname.to_string(),
            record_type: "CNAME".to_string(),
            ttl: Some(CNAME_TTL),
            values: vec![target.to_string()],
            upstream: None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeAction {
    Create,
    Delete,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Create => "CREATE",
            ChangeAction::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Change {
    pub action: ChangeAction,
    pub resource_record_set: RecordSet,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChangeSet {
    pub comment: String,
    pub changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new(hostname: &str) -> Self {
        Self {
            comment: format!("Updated the DNS with {hostname}"),
            changes: vec![],
        }
    }

    pub fn push(&mut self, action: ChangeAction, record: RecordSet) {
        self.changes.push(Change {
            action,
            resource_record_set: record,
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChangeInfo {
    pub id: String,
    pub status: String,
}

/// Domain of a hostname with more than two labels: everything after the first.
pub fn domain_of(hostname: &str) -> Option<&str> {
    if hostname.split('.').count() > 2 {
        hostname.split_once('.').map(|(_, domain)| domain)
    } else {
        None
    }
}

/// Strip the trailing dot from the zone name and the `/hostedzone/` prefix from its id.
pub fn clean_zone(zone: &HostedZone) -> Zone {
    Zone {
        name: zone.name.strip_suffix('.').unwrap_or(&zone.name).to_string(),
        id: zone.id.split('/').nth(2).unwrap_or(&zone.id).to_string(),
    }
}

pub fn find_record_set<'a>(records: &'a [RecordSet], name: &str) -> Option<&'a RecordSet> {
    records.iter().find(|r| r.name == name)
}

/// Change set replacing `existing` (if any) with a CNAME from `hostname` to `target`.
pub fn upsert_changes(hostname: &str, target: &str, existing: Option<RecordSet>) -> ChangeSet {
    let mut changes = ChangeSet::new(hostname);
    if let Some(record) = existing {
        changes.push(ChangeAction::Delete, record);
    }
    changes.push(ChangeAction::Create, RecordSet::cname(hostname, target));
    changes
}

/// Hosted zones whose name is `domain`.
pub async fn find_zones(api: &impl DnsApi, domain: &str) -> Result<Vec<Zone>> {
    debug!(domain, "fetching zones");
    let fqdn = format!("{domain}.");
    let zones: Vec<_> = api
        .list_hosted_zones()
        .await?
        .iter()
        .filter(|z| z.name == fqdn)
        .map(clean_zone)
        .collect();
    debug!(?zones, "zones");
    Ok(zones)
}

pub async fn find_zone(api: &impl DnsApi, domain: &str) -> Result<Zone> {
    let zone = find_zones(api, domain)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| DnsError::ZoneNotFound(domain.to_string()))?;
    Ok(zone)
}

pub async fn get_record(
    api: &impl DnsApi,
    zone_id: &str,
    hostname: &str,
) -> Result<Option<RecordSet>> {
    debug!(zone_id, hostname, "fetching record");
    let records = api.list_record_sets(zone_id).await?;
    Ok(find_record_set(&records, &format!("{hostname}.")).cloned())
}

/// Point `hostname` at `target`, replacing any record already named `hostname`.
pub async fn add_record(
    api: &impl DnsApi,
    zone_id: &str,
    hostname: &str,
    target: &str,
) -> Result<ChangeInfo> {
    let existing = get_record(api, zone_id, hostname).await?;
    debug!(?existing, "found record");
    let changes = upsert_changes(hostname, target, existing);
    update_records(api, zone_id, &changes).await
}

pub async fn remove_record(
    api: &impl DnsApi,
    zone_id: &str,
    hostname: &str,
) -> Result<ChangeInfo> {
    let record = get_record(api, zone_id, hostname)
        .await?
        .ok_or_else(|| DnsError::RecordNotFound(hostname.to_string()))?;
    let mut changes = ChangeSet::new(hostname);
    changes.push(ChangeAction::Delete, record);
    update_records(api, zone_id, &changes).await
}

async fn update_records(
    api: &impl DnsApi,
    zone_id: &str,
    changes: &ChangeSet,
) -> Result<ChangeInfo> {
    info!(zone_id, ?changes, "updating records");
    api.change_record_sets(zone_id, changes).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct MockDns {
        zones: Vec<HostedZone>,
        records: Vec<RecordSet>,
        applied: Mutex<Vec<(String, ChangeSet)>>,
    }

    impl MockDns {
        fn new(records: Vec<RecordSet>) -> Self {
            Self {
                zones: vec![
                    HostedZone {
                        name: "example.com.".to_string(),
                        id: "/hostedzone/Z1EXAMPLE".to_string(),
                    },
                    HostedZone {
                        name: "example.org.".to_string(),
                        id: "/hostedzone/Z2EXAMPLE".to_string(),
                    },
                ],
                records,
                applied: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl DnsApi for MockDns {
        async fn list_hosted_zones(&self) -> Result<Vec<HostedZone>> {
            Ok(self.zones.clone())
        }

        async fn list_record_sets(&self, _zone_id: &str) -> Result<Vec<RecordSet>> {
            Ok(self.records.clone())
        }

        async fn change_record_sets(
            &self,
            zone_id: &str,
            changes: &ChangeSet,
        ) -> Result<ChangeInfo> {
            self.applied
                .lock()
                .unwrap()
                .push((zone_id.to_string(), changes.clone()));
            Ok(ChangeInfo {
                id: "/change/C1".to_string(),
                status: "PENDING".to_string(),
            })
        }
    }

    fn existing() -> RecordSet {
        RecordSet {
            name: "www.example.com.".to_string(),
            record_type: "CNAME".to_string(),
            ttl: Some(300),
            values: vec!["old.example.net".to_string()],
            upstream: None,
        }
    }

    #[test]
    fn test_domain_of() {
        assert_eq!(domain_of("www.example.com"), Some("example.com"));
        assert_eq!(domain_of("a.b.example.com"), Some("b.example.com"));
        assert_eq!(domain_of("example.com"), None);
        assert_eq!(domain_of("localhost"), None);
    }

    #[test]
    fn test_clean_zone() {
        let zone = clean_zone(&HostedZone {
            name: "example.com.".to_string(),
            id: "/hostedzone/Z1EXAMPLE".to_string(),
        });
        assert_eq!(
            zone,
            Zone {
                name: "example.com".to_string(),
                id: "Z1EXAMPLE".to_string()
            }
        );
    }

    #[test]
    fn test_upsert_changes_replaces_existing() {
        let changes = upsert_changes("www.example.com", "lb.example.net", Some(existing()));
        assert_eq!(changes.comment, "Updated the DNS with www.example.com");
        let actions: Vec<_> = changes.changes.iter().map(|c| c.action).collect();
        assert_eq!(actions, vec![ChangeAction::Delete, ChangeAction::Create]);
        assert_eq!(changes.changes[0].resource_record_set, existing());

        let created = &changes.changes[1].resource_record_set;
        assert_eq!(created.record_type, "CNAME");
        assert_eq!(created.ttl, Some(CNAME_TTL));
        assert_eq!(created.values, vec!["lb.example.net"]);
    }

    #[test]
    fn test_change_set_json() {
        let changes = upsert_changes("www.example.com", "lb.example.net", None);
        let json = serde_json::to_value(&changes).unwrap();
        assert_eq!(json["Changes"][0]["Action"], "CREATE");
        assert_eq!(json["Changes"][0]["ResourceRecordSet"]["TTL"], 60);
        assert_eq!(json["Changes"][0]["ResourceRecordSet"]["Type"], "CNAME");
    }

    #[tokio::test]
    async fn test_find_zone() {
        let api = MockDns::new(vec![]);
        let zone = find_zone(&api, "example.org").await.unwrap();
        assert_eq!(zone.id, "Z2EXAMPLE");

        let err = find_zone(&api, "example.net").await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<DnsError>(),
            Some(&DnsError::ZoneNotFound("example.net".to_string()))
        );
    }

    #[tokio::test]
    async fn test_add_record_without_existing() {
        let api = MockDns::new(vec![]);
        let info = add_record(&api, "Z1EXAMPLE", "www.example.com", "lb.example.net")
            .await
            .unwrap();
        assert_eq!(info.status, "PENDING");

        let applied = api.applied.lock().unwrap();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].0, "Z1EXAMPLE");
        assert_eq!(applied[0].1.changes.len(), 1);
        assert_eq!(applied[0].1.changes[0].action, ChangeAction::Create);
    }

    #[tokio::test]
    async fn test_add_record_replaces_existing() {
        let api = MockDns::new(vec![existing()]);
        add_record(&api, "Z1EXAMPLE", "www.example.com", "lb.example.net")
            .await
            .unwrap();
        let applied = api.applied.lock().unwrap();
        assert_eq!(applied[0].1.changes[0].action, ChangeAction::Delete);
        assert_eq!(applied[0].1.changes[1].action, ChangeAction::Create);
    }

    #[tokio::test]
    async fn test_remove_record() {
        let api = MockDns::new(vec![existing()]);
        remove_record(&api, "Z1EXAMPLE", "www.example.com")
            .await
            .unwrap();
        {
            let applied = api.applied.lock().unwrap();
            assert_eq!(applied[0].1.changes.len(), 1);
            assert_eq!(applied[0].1.changes[0].resource_record_set, existing());
        }

        let err = remove_record(&api, "Z1EXAMPLE", "api.example.com")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "record not found for hostname: api.example.com");
        assert_eq!(api.applied.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_record_keeps_listed_record() {
        let listed = ResourceRecordSet::builder()
            .name("www.example.com.")
            .set_identifier("blue")
            .weight(10)
            .build();
        let mut record = existing();
        record.upstream = Some(listed.clone());
        let api = MockDns::new(vec![record]);

        remove_record(&api, "Z1EXAMPLE", "www.example.com")
            .await
            .unwrap();
        let applied = api.applied.lock().unwrap();
        assert_eq!(
            applied[0].1.changes[0].resource_record_set.upstream,
            Some(listed)
        );
    }
}
