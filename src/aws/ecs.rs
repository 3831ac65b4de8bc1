use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ec2 as ec2;
use aws_sdk_ecs as ecs;
use aws_types::region::Region;
use ecs::types;
use tracing::debug;

use super::{
    ec2::{get_instances_by_ids, to_ec2_instance},
    required,
};
use crate::cluster::{
    ClusterApi, ClusterInfo, Container, Ec2Instance, Instance, Task, TaskDefinition,
};

/// ECS and EC2 clients for one region.
pub struct EcsClients {
    ecs: ecs::Client,
    ec2: ec2::Client,
}

impl EcsClients {
    pub fn new(sdk_config: &SdkConfig, region: Option<Region>) -> Self {
        let ecs_config = ecs::config::Builder::from(sdk_config)
            .region(region.clone())
            .build();
        let ec2_config = ec2::config::Builder::from(sdk_config)
            .region(region)
            .build();
        Self {
            ecs: ecs::Client::from_conf(ecs_config),
            ec2: ec2::Client::from_conf(ec2_config),
        }
    }
}

#[async_trait]
impl ClusterApi for EcsClients {
    async fn describe_cluster(&self, cluster: &str) -> Result<Option<ClusterInfo>> {
        debug!(cluster, "describe cluster");
        let res = self.ecs.describe_clusters().clusters(cluster).send().await?;
        res.clusters()
            .into_iter()
            .flatten()
            .next()
            .map(to_cluster_info)
            .transpose()
    }

    async fn list_container_instances(&self, cluster: &str) -> Result<Vec<String>> {
        let res = self
            .ecs
            .list_container_instances()
            .cluster(cluster)
            .send()
            .await?;
        Ok(res.container_instance_arns().unwrap_or_default().to_vec())
    }

    async fn describe_container_instances(
        &self,
        cluster: &str,
        arns: Vec<String>,
    ) -> Result<Vec<Instance>> {
        debug!(cluster, ?arns, "describe container instances");
        let res = self
            .ecs
            .describe_container_instances()
            .cluster(cluster)
            .set_container_instances(Some(arns))
            .send()
            .await?;
        res.container_instances()
            .into_iter()
            .flatten()
            .map(to_instance)
            .collect()
    }

    async fn describe_ec2_instances(&self, ids: Vec<String>) -> Result<Vec<Ec2Instance>> {
        debug!(?ids, "describe ec2 instances");
        get_instances_by_ids(&self.ec2, ids)
            .await?
            .iter()
            .map(to_ec2_instance)
            .collect()
    }

    async fn list_tasks(&self, cluster: &str) -> Result<Vec<String>> {
        let res = self.ecs.list_tasks().cluster(cluster).send().await?;
        Ok(res.task_arns().unwrap_or_default().to_vec())
    }

    async fn describe_tasks(&self, cluster: &str, arns: Vec<String>) -> Result<Vec<Task>> {
        debug!(cluster, ?arns, "describe tasks");
        let res = self
            .ecs
            .describe_tasks()
            .cluster(cluster)
            .set_tasks(Some(arns))
            .send()
            .await?;
        res.tasks().into_iter().flatten().map(to_task).collect()
    }

    async fn describe_task_definition(&self, arn: &str) -> Result<TaskDefinition> {
        debug!(arn, "describe task definition");
        let res = self
            .ecs
            .describe_task_definition()
            .task_definition(arn)
            .send()
            .await?;
        let task_definition = res
            .task_definition()
            .with_context(|| format!("no task definition returned for {arn}"))?;
        to_task_definition(task_definition)
    }
}

fn to_cluster_info(cluster: &types::Cluster) -> Result<ClusterInfo> {
    Ok(ClusterInfo {
        cluster_name: required(cluster.cluster_name(), "cluster name")?,
        status: cluster.status().unwrap_or_default().to_string(),
        cluster_arn: required(cluster.cluster_arn(), "cluster arn")?,
    })
}

fn to_instance(ci: &types::ContainerInstance) -> Result<Instance> {
    Ok(Instance {
        container_instance_arn: required(ci.container_instance_arn(), "container instance arn")?,
        ec2_instance_id: required(ci.ec2_instance_id(), "container instance ec2 id")?,
        status: ci.status().unwrap_or_default().to_string(),
        agent_connected: ci.agent_connected(),
        ec2_instance: None,
    })
}

fn to_task(task: &types::Task) -> Result<Task> {
    let containers = task
        .containers()
        .into_iter()
        .flatten()
        .map(|c| Container {
            name: c.name().unwrap_or_default().to_string(),
        })
        .collect();
    Ok(Task {
        task_arn: required(task.task_arn(), "task arn")?,
        last_status: task.last_status().unwrap_or_default().to_string(),
        desired_status: task.desired_status().unwrap_or_default().to_string(),
        task_definition_arn: required(task.task_definition_arn(), "task definition arn")?,
        container_instance_arn: task.container_instance_arn().map(String::from),
        containers,
    })
}

fn to_task_definition(td: &types::TaskDefinition) -> Result<TaskDefinition> {
    let container_definitions = td
        .container_definitions()
        .into_iter()
        .flatten()
        .map(|c| Container {
            name: c.name().unwrap_or_default().to_string(),
        })
        .collect();
    Ok(TaskDefinition {
        family: required(td.family(), "task definition family")?,
        revision: td.revision(),
        task_definition_arn: required(td.task_definition_arn(), "task definition arn")?,
        container_definitions,
    })
}
