use anyhow::{Context, Result};
use atty::Stream;
use clap::Args;
use ecs_rs::{
    aws::{route53::Route53Dns, sdk_config},
    dns::{add_record, domain_of, find_zone, remove_record},
    render::render,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Args, Debug)]
pub struct DnsArgs {
    /// Hostname of the record, e.g. `www.example.com`
    hostname: String,

    /// CNAME target (required unless deleting)
    #[arg(required_unless_present = "delete")]
    target: Option<String>,

    /// Delete the hostname instead of creating it
    #[arg(long)]
    delete: bool,

    /// Don't do anything, show the resolved parameters
    #[arg(long)]
    dry: bool,

    /// AWS profile to load credentials from
    #[arg(long)]
    profile: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct Config {
    default_domain: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_domain: "janmyr.com".to_string(),
        }
    }
}

impl DnsArgs {
    pub async fn main(self) -> Result<()> {
        let config: Config = confy::load("ecs-rs", Some("dns"))?;
        let domain = domain_of(&self.hostname)
            .map(String::from)
            .unwrap_or(config.default_domain);

        if self.dry {
            println!("{self:#?}\ndomain: {domain}");
            return Ok(());
        }

        let api = Route53Dns::new(&sdk_config(self.profile.as_deref()).await);
        let zone = find_zone(&api, &domain).await?;
        info!(zone = %zone.name, id = %zone.id, "using hosted zone");

        let change = if self.delete {
            remove_record(&api, &zone.id, &self.hostname).await?
        } else {
            let target = self
                .target
                .as_deref()
                .context("target is required to create a record")?;
            add_record(&api, &zone.id, &self.hostname, target).await?
        };
        println!("{}", render(&change, false, atty::is(Stream::Stdout))?);
        Ok(())
    }
}
