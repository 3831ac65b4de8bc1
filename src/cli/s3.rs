use anyhow::Result;
use clap::Args;
use ecs_rs::{
    aws::{region, s3::S3Buckets, sdk_config},
    s3::purge_bucket,
};

#[derive(Args, Debug)]
pub struct S3Args {
    /// Buckets to empty and delete
    #[arg(required = true)]
    buckets: Vec<String>,

    /// AWS region of the buckets (default: from environment)
    #[arg(long, short = 'r')]
    region: Option<String>,

    /// AWS profile to load credentials from
    #[arg(long)]
    profile: Option<String>,
}

impl S3Args {
    pub async fn main(self) -> Result<()> {
        let sdk_config = sdk_config(self.profile.as_deref()).await;
        let api = S3Buckets::new(&sdk_config, self.region.map(region));
        for bucket in &self.buckets {
            println!("{bucket}");
            let deleted = purge_bucket(&api, bucket).await?;
            println!("deleted {deleted} object versions and the bucket");
        }
        Ok(())
    }
}
