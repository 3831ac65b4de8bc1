//! Serializable projections of a [`Cluster`].

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::{Cluster, ClusterInfo, Instance, LookupError, Task, TaskDefinition};

/// Public name reported for instances with no running EC2 instance behind them.
pub const NOT_RUNNING: &str = "NOT RUNNING";

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Cluster identity only
    Flat,
    /// Cluster identity with unprojected instances and tasks
    Full,
    /// Cluster identity with simplified instances, tasks and task definitions
    #[default]
    Simple,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ClusterView {
    Flat(ClusterInfo),
    Full(FullView),
    Simple(SimpleView),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullView {
    pub cluster_name: String,
    pub status: String,
    pub cluster_arn: String,
    pub instances: Vec<Instance>,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleView {
    pub cluster_name: String,
    pub status: String,
    pub instances: Vec<InstanceView>,
    pub tasks: Vec<TaskView>,
    pub task_definitions: Vec<TaskDefinitionView>,
}

/// Simple instance projection; the basic variant leaves out the ARN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceView {
    pub ec2_instance_id: String,
    #[serde(rename = "PublicDnsName")]
    pub public_dns_name: String,
    pub status: String,
    pub agent_connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_instance_arn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub name: Option<String>,
    pub last_status: String,
    pub desired_status: String,
    pub task_arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinitionView {
    pub family: String,
    pub revision: i32,
    pub container_definitions: Vec<String>,
    pub task_definition_arn: String,
}

/// A task's simple view joined with the basic view of the instance it runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskWithInstance {
    #[serde(flatten)]
    pub task: TaskView,
    pub instance: InstanceView,
}

impl Instance {
    pub fn public_dns_name(&self) -> &str {
        self.ec2_instance
            .as_ref()
            .and_then(|i| i.public_dns_name.as_deref())
            .filter(|name| !name.is_empty())
            .unwrap_or(NOT_RUNNING)
    }

    pub fn simple(&self) -> InstanceView {
        InstanceView {
            ec2_instance_id: self.ec2_instance_id.clone(),
            public_dns_name: self.public_dns_name().to_string(),
            status: self.status.clone(),
            agent_connected: self.agent_connected,
            container_instance_arn: Some(self.container_instance_arn.clone()),
        }
    }

    pub fn basic(&self) -> InstanceView {
        InstanceView {
            container_instance_arn: None,
            ..self.simple()
        }
    }
}

impl Task {
    /// Part of the task ARN after the first `/`.
    pub fn short_arn(&self) -> &str {
        self.task_arn
            .split('/')
            .nth(1)
            .unwrap_or(&self.task_arn)
    }

    pub fn simple(&self) -> TaskView {
        TaskView {
            name: self.containers.first().map(|c| c.name.clone()),
            last_status: self.last_status.clone(),
            desired_status: self.desired_status.clone(),
            task_arn: self.short_arn().to_string(),
        }
    }
}

impl TaskDefinition {
    pub fn simple(&self) -> TaskDefinitionView {
        TaskDefinitionView {
            family: self.family.clone(),
            revision: self.revision,
            container_definitions: self
                .container_definitions
                .iter()
                .map(|c| c.name.clone())
                .collect(),
            task_definition_arn: self.task_definition_arn.clone(),
        }
    }
}

impl Cluster {
    pub fn view(&self, format: Format) -> ClusterView {
        let info = self.info.clone();
        match format {
            Format::Flat => ClusterView::Flat(info),
            Format::Full => ClusterView::Full(FullView {
                cluster_name: info.cluster_name,
                status: info.status,
                cluster_arn: info.cluster_arn,
                instances: self.instances.clone(),
                tasks: self.tasks.clone(),
            }),
            Format::Simple => ClusterView::Simple(self.simple()),
        }
    }

    pub fn simple(&self) -> SimpleView {
        SimpleView {
            cluster_name: self.info.cluster_name.clone(),
            status: self.info.status.clone(),
            instances: self.instances.iter().map(Instance::simple).collect(),
            tasks: self.tasks.iter().map(Task::simple).collect(),
            task_definitions: self
                .task_definitions
                .iter()
                .map(TaskDefinition::simple)
                .collect(),
        }
    }

    /// Simple task views, each with the instance it runs on.
    pub fn tasks_view(&self) -> Result<Vec<TaskWithInstance>, LookupError> {
        let index = self.index();
        self.tasks
            .iter()
            .map(|task| -> Result<_, LookupError> {
                Ok(TaskWithInstance {
                    task: task.simple(),
                    instance: index.instance_for(task)?.basic(),
                })
            })
            .collect()
    }
}
