use anyhow::Result;
use aws_sdk_ec2 as ec2;
use ec2::{types::Instance, Client};

use super::required;
use crate::cluster::Ec2Instance;

/// Describe the given instances in one batched call.
pub async fn get_instances_by_ids(client: &Client, ids: Vec<String>) -> Result<Vec<Instance>> {
    let res = client
        .describe_instances()
        .set_instance_ids(Some(ids))
        .send()
        .await?;

    let instances = res
        .reservations()
        .into_iter()
        .flatten()
        .flat_map(|r| r.instances().into_iter().flatten())
        .cloned()
        .collect();
    Ok(instances)
}

pub fn to_ec2_instance(instance: &Instance) -> Result<Ec2Instance> {
    Ok(Ec2Instance {
        instance_id: required(instance.instance_id(), "ec2 instance id")?,
        public_dns_name: instance.public_dns_name().map(String::from),
        state: instance
            .state()
            .and_then(|s| s.name())
            .map(|name| name.as_str().to_string()),
    })
}
