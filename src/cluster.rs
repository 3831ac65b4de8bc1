//! In-memory model of an ECS cluster and the aggregation that builds it.
//!
//! A [`Cluster`] is assembled once per run from a handful of read-only
//! queries (see [`ClusterContext::fetch_model`]) and is read-only afterwards.
//! Tasks reference their container instance and task definition by ARN; those
//! references are resolved through a [`ClusterIndex`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

pub mod view;

#[cfg(test)]
pub(crate) mod mock;

pub use view::Format;

/// Read-only queries the aggregation needs from ECS and EC2.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Describe a single cluster; `None` if the service knows no such cluster.
    async fn describe_cluster(&self, cluster: &str) -> Result<Option<ClusterInfo>>;

    async fn list_container_instances(&self, cluster: &str) -> Result<Vec<String>>;

    /// Describe container instances. The returned instances carry no EC2 record yet.
    async fn describe_container_instances(
        &self,
        cluster: &str,
        arns: Vec<String>,
    ) -> Result<Vec<Instance>>;

    async fn describe_ec2_instances(&self, ids: Vec<String>) -> Result<Vec<Ec2Instance>>;

    async fn list_tasks(&self, cluster: &str) -> Result<Vec<String>>;

    async fn describe_tasks(&self, cluster: &str, arns: Vec<String>) -> Result<Vec<Task>>;

    async fn describe_task_definition(&self, arn: &str) -> Result<TaskDefinition>;
}

/// Cluster identity fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterInfo {
    pub cluster_name: String,
    pub status: String,
    pub cluster_arn: String,
}

/// Container instance merged with the EC2 instance it runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub container_instance_arn: String,
    pub ec2_instance_id: String,
    pub status: String,
    pub agent_connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ec2_instance: Option<Ec2Instance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Ec2Instance {
    pub instance_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_dns_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub task_arn: String,
    pub last_status: String,
    pub desired_status: String,
    pub task_definition_arn: String,
    /// Absent for tasks not placed on a container instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_instance_arn: Option<String>,
    pub containers: Vec<Container>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    pub family: String,
    pub revision: i32,
    pub task_definition_arn: String,
    pub container_definitions: Vec<Container>,
}

/// A task reference that does not resolve within the fetched cluster.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("task {task_arn} has no container instance")]
    MissingContainerInstance { task_arn: String },

    #[error("container instance {container_instance_arn} of task {task_arn} not found in cluster")]
    InstanceNotFound {
        task_arn: String,
        container_instance_arn: String,
    },

    #[error("task definition {task_definition_arn} of task {task_arn} not found in cluster")]
    TaskDefinitionNotFound {
        task_arn: String,
        task_definition_arn: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    info: ClusterInfo,
    instances: Vec<Instance>,
    tasks: Vec<Task>,
    task_definitions: Vec<TaskDefinition>,
}

impl Cluster {
    /// Attach the fetched collections to a cluster, checking that every task
    /// resolves to one of `instances` and one of `task_definitions`.
    pub fn assemble(
        info: ClusterInfo,
        instances: Vec<Instance>,
        tasks: Vec<Task>,
        task_definitions: Vec<TaskDefinition>,
    ) -> Result<Self, LookupError> {
        let cluster = Self {
            info,
            instances,
            tasks,
            task_definitions,
        };
        let index = cluster.index();
        for task in &cluster.tasks {
            index.instance_for(task)?;
            index.task_definition_for(task)?;
        }
        Ok(cluster)
    }

    pub fn info(&self) -> &ClusterInfo {
        &self.info
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task_definitions(&self) -> &[TaskDefinition] {
        &self.task_definitions
    }

    pub fn index(&self) -> ClusterIndex<'_> {
        ClusterIndex::new(&self.instances, &self.task_definitions)
    }
}

/// ARN-keyed lookup over a cluster's instances and task definitions.
pub struct ClusterIndex<'a> {
    instances: HashMap<&'a str, &'a Instance>,
    task_definitions: HashMap<&'a str, &'a TaskDefinition>,
}

impl<'a> ClusterIndex<'a> {
    pub fn new(instances: &'a [Instance], task_definitions: &'a [TaskDefinition]) -> Self {
        Self {
            instances: instances
                .iter()
                .map(|i| (i.container_instance_arn.as_str(), i))
                .collect(),
            task_definitions: task_definitions
                .iter()
                .map(|td| (td.task_definition_arn.as_str(), td))
                .collect(),
        }
    }

    pub fn instance_for(&self, task: &Task) -> Result<&'a Instance, LookupError> {
        let arn = task
            .container_instance_arn
            .as_deref()
            .ok_or_else(|| LookupError::MissingContainerInstance {
                task_arn: task.task_arn.clone(),
            })?;
        self.instances
            .get(arn)
            .copied()
            .ok_or_else(|| LookupError::InstanceNotFound {
                task_arn: task.task_arn.clone(),
                container_instance_arn: arn.to_string(),
            })
    }

    pub fn task_definition_for(&self, task: &Task) -> Result<&'a TaskDefinition, LookupError> {
        self.task_definitions
            .get(task.task_definition_arn.as_str())
            .copied()
            .ok_or_else(|| LookupError::TaskDefinitionNotFound {
                task_arn: task.task_arn.clone(),
                task_definition_arn: task.task_definition_arn.clone(),
            })
    }
}

/// Distinct task definition ARNs referenced by `tasks`, in first-seen order.
pub fn distinct_task_definition_arns(tasks: &[Task]) -> Vec<String> {
    let mut seen = HashSet::new();
    tasks
        .iter()
        .map(|t| t.task_definition_arn.as_str())
        .filter(|arn| seen.insert(*arn))
        .map(String::from)
        .collect()
}

/// Attach to each container instance the EC2 record with the same instance id.
pub fn merge_instances(instances: Vec<Instance>, ec2_instances: Vec<Ec2Instance>) -> Vec<Instance> {
    let mut by_id: HashMap<String, Ec2Instance> = ec2_instances
        .into_iter()
        .map(|i| (i.instance_id.clone(), i))
        .collect();
    instances
        .into_iter()
        .map(|mut ci| {
            ci.ec2_instance = by_id.remove(&ci.ec2_instance_id);
            ci
        })
        .collect()
}

/// Everything one aggregation needs: the API handle and the cluster to inspect.
pub struct ClusterContext<A> {
    api: A,
    cluster_name: String,
}

impl<A: ClusterApi> ClusterContext<A> {
    pub fn new(api: A, cluster_name: impl Into<String>) -> Self {
        Self {
            api,
            cluster_name: cluster_name.into(),
        }
    }

    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    /// Fetch and join the cluster, its instances, tasks and task definitions.
    ///
    /// Cluster, instance and task queries run concurrently; task definitions
    /// are fetched concurrently once the tasks are known. The first failure
    /// aborts the whole aggregation.
    pub async fn fetch_model(&self) -> Result<Cluster> {
        debug!(cluster = %self.cluster_name, "fetching cluster model");
        let (info, instances, tasks) = tokio::try_join!(
            self.fetch_cluster(),
            self.fetch_instances(),
            self.fetch_tasks()
        )?;
        let task_definitions = self.fetch_task_definitions(&tasks).await?;
        let cluster = Cluster::assemble(info, instances, tasks, task_definitions)
            .with_context(|| format!("inconsistent cluster {}", self.cluster_name))?;
        Ok(cluster)
    }

    async fn fetch_cluster(&self) -> Result<ClusterInfo> {
        self.api
            .describe_cluster(&self.cluster_name)
            .await?
            .with_context(|| format!("cluster {} not found", self.cluster_name))
    }

    async fn fetch_instances(&self) -> Result<Vec<Instance>> {
        let arns = self.api.list_container_instances(&self.cluster_name).await?;
        debug!(count = arns.len(), "listed container instances");
        if arns.is_empty() {
            return Ok(vec![]);
        }
        let instances = self
            .api
            .describe_container_instances(&self.cluster_name, arns)
            .await?;
        let ids = instances.iter().map(|i| i.ec2_instance_id.clone()).collect();
        let ec2_instances = self.api.describe_ec2_instances(ids).await?;
        Ok(merge_instances(instances, ec2_instances))
    }

    async fn fetch_tasks(&self) -> Result<Vec<Task>> {
        let arns = self.api.list_tasks(&self.cluster_name).await?;
        debug!(count = arns.len(), "listed tasks");
        if arns.is_empty() {
            return Ok(vec![]);
        }
        self.api.describe_tasks(&self.cluster_name, arns).await
    }

    async fn fetch_task_definitions(&self, tasks: &[Task]) -> Result<Vec<TaskDefinition>> {
        let arns = distinct_task_definition_arns(tasks);
        debug!(?arns, "fetching task definitions");
        try_join_all(arns.iter().map(|arn| self.api.describe_task_definition(arn))).await
    }
}
