mod collect;
mod regions;
mod status;

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "farmaturno-cli")]
#[command(about = "Operator tools for the on-duty pharmacy dataset")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one collection against the upstream site and commit the dataset
    Collect {
        /// Fetch and merge everything but leave the persisted dataset alone
        #[arg(long)]
        dry_run: bool,
    },
    /// Summarize the persisted dataset
    Status,
    /// List the regions queried during discovery
    Regions,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    if matches!(command, Commands::Regions) {
        regions::run_regions();
        return Ok(());
    }

    dotenvy::dotenv().ok();
    let config = farmaturno_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match command {
        Commands::Collect { dry_run } => collect::run_collect(&config, dry_run).await,
        Commands::Status => status::run_status(&config).await,
        Commands::Regions => Ok(()),
    }
}
