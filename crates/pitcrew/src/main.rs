use anyhow::Result;
use clap::{Parser, Subcommand};
use pitcrew::hosting::GitHubHosting;
use pitcrew::orchestrator::AdapterScanEngine;
use pitcrew::worker::Worker;
use pitcrew::{server, Orchestrator, Settings};
use pitcrew_github::GitHubClient;
use pitcrew_store::{BaselineStore, JobQueue};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "pitcrew",
    version,
    about = "CI security gateway for Solidity repositories",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the webhook intake server
    Serve,
    /// Run a scan worker
    Worker,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = match std::env::var("PITCREW_LOG") {
        Ok(spec) => EnvFilter::new(spec),
        Err(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    match cli.command {
        Commands::Serve => server::serve(&settings).await,
        Commands::Worker => {
            let auth = settings.app_auth()?;
            let hosting = GitHubHosting::new(GitHubClient::new(), auth);
            let baselines = BaselineStore::connect(&settings.redis_url).await?;
            let queue = JobQueue::connect(&settings.redis_url).await?;
            let orchestrator = Orchestrator::new(hosting, baselines, AdapterScanEngine);
            Worker::new(queue, orchestrator).run().await
        }
    }
}
