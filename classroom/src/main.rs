mod server;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use classroom_api::AppState;
use classroom_core::{bootstrap::load_config, logging};

use server::ClassroomServer;

#[derive(Parser, Debug)]
#[command(name = "classroom")]
#[command(about = "Classroom Interactive relay server", long_about = None)]
struct Args {
    /// Config file (YAML or TOML); defaults to ./config.yaml when present
    #[arg(long, env = "CLASSROOM_CONFIG_PATH")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load and validate configuration
    let config = load_config(args.config.as_deref())?;

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("Classroom server starting...");
    info!("HTTP address: {}", config.http_address());
    info!("Environment: {}", config.server.environment);

    // 3. Build shared services
    let state = AppState::new(&config).context("Failed to initialize application state")?;

    // 4. Run until shutdown
    ClassroomServer::new(config, state).start().await
}
