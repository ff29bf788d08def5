use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use visitfall::{
    config::Config,
    roblox::RobloxClient,
    server::{self, AppState},
    storage::SqliteStorage,
    tracker::{spawn_collection_loop, Tracker},
};

/// Roblox visit-milestone tracker and forecaster
#[derive(Debug, Parser)]
#[command(name = "visitfall", version, about)]
struct Cli {
    /// Roblox place id to track (overrides PLACE_ID)
    #[arg(long)]
    place_id: Option<u64>,

    /// Listen address for the read API (overrides LISTEN_ADDR)
    #[arg(long)]
    listen: Option<std::net::SocketAddr>,

    /// Database file path (overrides DATABASE_PATH)
    #[arg(long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(place_id) = cli.place_id {
        config.tracker.place_id = place_id;
    }
    if let Some(listen) = cli.listen {
        config.server.listen_addr = listen;
    }
    if let Some(database) = cli.database {
        config.database.path = database;
    }

    // Initialize logging
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        place_id = config.tracker.place_id,
        "Visitfall starting..."
    );

    // Initialize storage
    let storage = match SqliteStorage::new(&config.database).await {
        Ok(s) => {
            info!(path = %config.database.path.display(), "Database initialized");
            s
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize database");
            return Err(e.into());
        }
    };

    // Initialize Roblox client
    let client = match RobloxClient::new(
        config.tracker.place_id,
        &config.roblox,
        config.request.clone(),
    ) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "Failed to initialize Roblox client");
            return Err(e.into());
        }
    };

    // Start the collection loop; the first cycle fires immediately
    let tracker = Arc::new(Tracker::new(storage.clone(), &config.tracker));
    let _collector =
        spawn_collection_loop(client, tracker.clone(), config.tracker.poll_interval_secs);

    info!(
        interval_secs = config.tracker.poll_interval_secs,
        milestone_step = config.tracker.milestone_step,
        "Collection loop started"
    );

    // Serve the read API
    let state = AppState::new(storage, tracker);

    if let Err(e) = server::run(state, &config).await {
        error!(error = %e, "Server error");
        return Err(e);
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        visitfall::config::LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        visitfall::config::LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
