use anyhow::{Context, Result};
use aws_config::SdkConfig;
use aws_types::region::Region;

pub mod ec2;
pub mod ecs;
pub mod route53;
pub mod s3;

/// Shared SDK configuration, optionally read from a named profile.
pub async fn sdk_config(profile: Option<&str>) -> SdkConfig {
    let loader = aws_config::from_env();
    let loader = match profile {
        Some(name) => loader.profile_name(name),
        None => loader,
    };
    loader.load().await
}

pub fn region(name: impl Into<String>) -> Region {
    Region::new(name.into())
}

/// Owned copy of a response field the crate cannot do without.
fn required(value: Option<&str>, field: &str) -> Result<String> {
    value
        .map(str::to_string)
        .with_context(|| format!("{field} missing from response"))
}
