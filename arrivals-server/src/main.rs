use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use arrivals_server::app;
use arrivals_server::config::AppConfig;

/// Live bus arrivals board for a handful of nearby stops.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the JSON config file
    #[arg(short, long, env = "ARRIVALS_CONFIG", default_value = "config.json")]
    config: PathBuf,

    /// GTFS-Realtime API key; overrides the config file
    #[arg(long, env = "GTFS_R_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match AppConfig::load(&cli.config) {
        Ok(config) => config.with_api_key(cli.api_key),
        Err(e) => {
            error!(error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    info!(
        config = %cli.config.display(),
        stops = config.stops.len(),
        "configuration loaded"
    );

    match app::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "arrivals server failed");
            ExitCode::FAILURE
        }
    }
}
