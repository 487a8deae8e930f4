use anyhow::Result;
use clap::Parser;
use std::fs::OpenOptions;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use jobhunt::cli::{self, Cli};
use jobhunt::core::ConfigManager;

const DEFAULT_LOG_FILTER: &str = "jobhunt=info,rocket=warn";

fn init_logging(config: &ConfigManager) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    // Optional JSON log file, cleared on startup
    let json_layer = match &config.server.log_path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)?;
            Some(
                fmt::layer()
                    .json()
                    .with_writer(std::sync::Mutex::new(file))
                    .with_current_span(true)
                    .with_span_list(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(json_layer)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console-only logging until the configured subscriber is installed
    let bootstrap = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .finish();
    let config = tracing::subscriber::with_default(bootstrap, ConfigManager::load)?;
    init_logging(&config)?;

    info!(
        "Environment: {}",
        std::env::var("JOBHUNT_ENV")
            .or_else(|_| std::env::var("ENVIRONMENT"))
            .unwrap_or_else(|_| "local".to_string())
    );

    cli::run(cli, config).await
}
