use anyhow::Result;
use atty::Stream;
use clap::Args;
use ecs_rs::{
    aws::{ecs::EcsClients, region, sdk_config},
    cluster::{Cluster, ClusterContext, Format},
    render::render,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

#[derive(Args, Debug)]
pub struct EcsArgs {
    /// AWS region (default: from configuration)
    #[arg(long, short = 'r')]
    region: Option<String>,

    /// Cluster name (default: from configuration)
    #[arg(long, short = 'c')]
    cluster: Option<String>,

    /// Include tasks, with the instance each runs on
    #[arg(long, short = 't')]
    tasks: bool,

    /// Include container instances
    #[arg(long, short = 'i')]
    instances: bool,

    /// Include task definitions
    #[arg(long = "taskdefs", short = 'd')]
    task_definitions: bool,

    /// Projection of the whole cluster, used when no section is selected
    #[arg(long, value_enum, default_value_t = Format::Simple)]
    format: Format,

    /// Print JSON instead of a structural dump
    #[arg(long, short = 'j')]
    json: bool,

    /// AWS profile to load credentials from
    #[arg(long)]
    profile: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct Config {
    region: String,
    cluster: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region: "eu-west-1".to_string(),
            cluster: "unstable".to_string(),
        }
    }
}

impl EcsArgs {
    pub async fn main(self) -> Result<()> {
        let config: Config = confy::load("ecs-rs", Some("ecs"))?;
        let region_name = self.region.clone().unwrap_or(config.region);
        let cluster_name = self.cluster.clone().unwrap_or(config.cluster);
        debug!(region = %region_name, cluster = %cluster_name, "ecs");

        let sdk_config = sdk_config(self.profile.as_deref()).await;
        let clients = EcsClients::new(&sdk_config, Some(region(region_name)));
        let cluster = ClusterContext::new(clients, cluster_name)
            .fetch_model()
            .await?;

        let out = self.compose(&cluster)?;
        println!("{}", render(&out, self.json, atty::is(Stream::Stdout))?);
        Ok(())
    }

    /// The selected sections, or the whole cluster in the chosen format when none is.
    fn compose(&self, cluster: &Cluster) -> Result<Value> {
        let mut out = Map::new();
        if self.tasks {
            out.insert(
                "tasks".to_string(),
                serde_json::to_value(cluster.tasks_view()?)?,
            );
        }
        if self.instances || self.task_definitions {
            let simple = cluster.simple();
            if self.instances {
                out.insert(
                    "instances".to_string(),
                    serde_json::to_value(simple.instances)?,
                );
            }
            if self.task_definitions {
                out.insert(
                    "taskDefinitions".to_string(),
                    serde_json::to_value(simple.task_definitions)?,
                );
            }
        }
        if out.is_empty() {
            return Ok(serde_json::to_value(cluster.view(self.format))?);
        }
        Ok(Value::Object(out))
    }
}
