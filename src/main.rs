mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cli::{DnsArgs, EcsArgs, S3Args};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Log progress to stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect an ECS cluster's instances, tasks and task definitions
    Ecs(EcsArgs),
    /// Create or delete a Route53 CNAME record
    Dns(DnsArgs),
    /// Empty and delete S3 buckets, including every object version
    S3(S3Args),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("ecs_rs=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    use Commands::*;
    match cli.command {
        Ecs(args) => args.main().await,
        Dns(args) => args.main().await,
        S3(args) => args.main().await,
    }
}
