//! In-memory [`ClusterApi`] for tests, counting the describe calls it serves.

use super::*;
use anyhow::bail;
use std::sync::atomic::{AtomicUsize, Ordering};

const PREFIX: &str = "arn:aws:ecs:eu-west-1:123456789012";

#[derive(Default)]
pub struct Calls {
    pub describe_container_instances: AtomicUsize,
    pub describe_ec2_instances: AtomicUsize,
    pub describe_tasks: AtomicUsize,
    pub describe_task_definition: AtomicUsize,
}

pub struct MockApi {
    pub cluster: ClusterInfo,
    pub container_instances: Vec<Instance>,
    pub ec2_instances: Vec<Ec2Instance>,
    pub tasks: Vec<Task>,
    pub task_definitions: Vec<TaskDefinition>,
    pub fail_describe_tasks: bool,
    pub calls: Calls,
}

impl MockApi {
    pub fn new(cluster_name: &str) -> Self {
        Self {
            cluster: cluster_info(cluster_name),
            container_instances: vec![],
            ec2_instances: vec![],
            tasks: vec![],
            task_definitions: vec![],
            fail_describe_tasks: false,
            calls: Calls::default(),
        }
    }
}

#[async_trait]
impl ClusterApi for MockApi {
    async fn describe_cluster(&self, cluster: &str) -> Result<Option<ClusterInfo>> {
        Ok((self.cluster.cluster_name == cluster).then(|| self.cluster.clone()))
    }

    async fn list_container_instances(&self, _cluster: &str) -> Result<Vec<String>> {
        Ok(self
            .container_instances
            .iter()
            .map(|i| i.container_instance_arn.clone())
            .collect())
    }

    async fn describe_container_instances(
        &self,
        _cluster: &str,
        arns: Vec<String>,
    ) -> Result<Vec<Instance>> {
        self.calls
            .describe_container_instances
            .fetch_add(1, Ordering::SeqCst);
        Ok(self
            .container_instances
            .iter()
            .filter(|i| arns.contains(&i.container_instance_arn))
            .cloned()
            .collect())
    }

    async fn describe_ec2_instances(&self, ids: Vec<String>) -> Result<Vec<Ec2Instance>> {
        self.calls.describe_ec2_instances.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .ec2_instances
            .iter()
            .filter(|i| ids.contains(&i.instance_id))
            .cloned()
            .collect())
    }

    async fn list_tasks(&self, _cluster: &str) -> Result<Vec<String>> {
        Ok(self.tasks.iter().map(|t| t.task_arn.clone()).collect())
    }

    async fn describe_tasks(&self, _cluster: &str, arns: Vec<String>) -> Result<Vec<Task>> {
        self.calls.describe_tasks.fetch_add(1, Ordering::SeqCst);
        if self.fail_describe_tasks {
            bail!("describe tasks failed");
        }
        Ok(self
            .tasks
            .iter()
            .filter(|t| arns.contains(&t.task_arn))
            .cloned()
            .collect())
    }

    async fn describe_task_definition(&self, arn: &str) -> Result<TaskDefinition> {
        self.calls
            .describe_task_definition
            .fetch_add(1, Ordering::SeqCst);
        self.task_definitions
            .iter()
            .find(|td| td.task_definition_arn == arn)
            .cloned()
            .with_context(|| format!("unable to describe task definition {arn}"))
    }
}

pub fn cluster_info(name: &str) -> ClusterInfo {
    ClusterInfo {
        cluster_name: name.to_string(),
        status: "ACTIVE".to_string(),
        cluster_arn: format!("{PREFIX}:cluster/{name}"),
    }
}

pub fn ci_arn(id: &str) -> String {
    format!("{PREFIX}:container-instance/{id}")
}

pub fn td_arn(family_revision: &str) -> String {
    format!("{PREFIX}:task-definition/{family_revision}")
}

pub fn container_instance(id: &str, ec2_instance_id: &str) -> Instance {
    Instance {
        container_instance_arn: ci_arn(id),
        ec2_instance_id: ec2_instance_id.to_string(),
        status: "ACTIVE".to_string(),
        agent_connected: true,
        ec2_instance: None,
    }
}

pub fn ec2_instance(id: &str, public_dns_name: &str) -> Ec2Instance {
    Ec2Instance {
        instance_id: id.to_string(),
        public_dns_name: Some(public_dns_name.to_string()),
        state: Some("running".to_string()),
    }
}

/// A running task with a single container named after the task definition family.
pub fn task(id: &str, family_revision: &str, container_instance_id: &str) -> Task {
    let family = family_revision.split(':').next().unwrap_or(family_revision);
    Task {
        task_arn: format!("{PREFIX}:task/{id}"),
        last_status: "RUNNING".to_string(),
        desired_status: "RUNNING".to_string(),
        task_definition_arn: td_arn(family_revision),
        container_instance_arn: Some(ci_arn(container_instance_id)),
        containers: vec![Container {
            name: family.to_string(),
        }],
    }
}

pub fn task_definition(family: &str, revision: i32) -> TaskDefinition {
    TaskDefinition {
        family: family.to_string(),
        revision,
        task_definition_arn: td_arn(&format!("{family}:{revision}")),
        container_definitions: vec![
            Container {
                name: family.to_string(),
            },
            Container {
                name: "log-router".to_string(),
            },
        ],
    }
}
