//! biolink Daemon - biosignal acquisition and session recording
//!
//! Runs as a background service. Control commands arrive on a Unix socket,
//! live events are streamed on a second one, and sessions are written as CSV
//! artifacts into the recordings directory.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, Level};

use biolink_broadcaster::{EventBroadcaster, EventStreamServer};
use biolink_daemon::version::version_long;
use biolink_daemon::{ControlSurface, DaemonConfig, IpcServer};
use biolink_recorder::SessionRecorder;

#[derive(Parser)]
#[command(name = "biolink-daemon", version, about = "Biosignal acquisition and session recording daemon")]
struct Cli {
    /// Config file (default: <config dir>/biolink/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log at debug level regardless of the config file
    #[arg(short, long)]
    verbose: bool,

    /// Print build information and exit
    #[arg(long)]
    version_info: bool,
}

fn log_level(config: &DaemonConfig, verbose: bool) -> Level {
    if verbose {
        return Level::DEBUG;
    }
    config.log_level.parse().unwrap_or(Level::INFO)
}

fn remove_socket(path: &Path) {
    if path.exists() {
        let _ = std::fs::remove_file(path);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version_info {
        print!("{}", version_long());
        return Ok(());
    }

    // Load configuration
    let config = match &cli.config {
        Some(path) => DaemonConfig::load_from(path),
        None => DaemonConfig::load(),
    }
    .context("Failed to load configuration")?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(log_level(&config, cli.verbose))
        .init();

    info!("🧬 Starting biolink daemon v{}", env!("CARGO_PKG_VERSION"));
    info!("📋 Configuration loaded from {}", config.config_path.display());

    let recorder = Arc::new(
        SessionRecorder::new(&config.recordings_dir)
            .with_context(|| format!("Failed to open recordings dir {}", config.recordings_dir))?,
    );
    let broadcaster = Arc::new(EventBroadcaster::new());

    let source = config.source;
    let source_rate = config.source_rate;
    let control = Arc::new(
        ControlSurface::new(
            config.to_acquisition_config(),
            Arc::clone(&recorder),
            Arc::clone(&broadcaster),
            Box::new(move || source.create(source_rate)),
        )
        .context("Failed to initialize control surface")?,
    );

    info!("  - Source: {:?}", config.source);
    info!(
        "  - Decimation: {} Hz -> {} Hz",
        config.source_rate, config.target_rate
    );
    info!("  - Recordings: {}", config.recordings_dir);

    // Live event stream for UI clients
    let events_socket = PathBuf::from(&config.events_socket_path);
    let event_server = EventStreamServer::new(&events_socket, Arc::clone(&broadcaster));
    event_server
        .start()
        .await
        .context("Failed to start event stream server")?;

    // Control commands
    let socket_path = PathBuf::from(&config.socket_path);
    info!("🔌 Starting IPC server on {}", socket_path.display());
    let mut ipc_server = IpcServer::new(&socket_path, Arc::clone(&control))
        .context("Failed to start IPC server")?;

    info!("🚀 biolink daemon ready!");

    tokio::select! {
        result = ipc_server.run() => {
            if let Err(e) = result {
                error!("IPC server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("🛑 Received shutdown signal");
        }
    }

    // Cleanup
    info!("🧹 Shutting down...");
    control.shutdown().await;

    if let Err(e) = event_server.stop().await {
        error!("Failed to stop event stream server: {}", e);
    }
    remove_socket(&socket_path);

    info!("👋 biolink daemon stopped");
    Ok(())
}
