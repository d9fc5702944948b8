//! # memvitals Agent
//!
//! A small local daemon that answers named diagnostic queries about process
//! and host memory state over a Unix domain socket.
//!
//! ## Operations
//! - **getMemoryUsage**: full seven-field memory report (heap, PSS, host)
//! - **getPeakMemoryUsage**: current reserved size in MB (an approximation)
//!
//! Any other operation name gets a distinct not-implemented reply.
//!
//! ## Heap attribution
//! The binary installs [`TrackingAllocator`] as the global allocator so the
//! "heap used" figure reflects live allocator bytes rather than resident
//! size alone.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, error, info};

use memvitals_agent::config::{AgentConfig, LogFormat, DEFAULT_CONFIG_PATH};
use memvitals_agent::handlers::QueryHandler;
use memvitals_agent::server::QueryServer;
use memvitals_telemetry::{HostMemorySource, TrackingAllocator};

#[global_allocator]
static GLOBAL: TrackingAllocator = TrackingAllocator::system();

/// Diagnostic query agent reporting process and host memory state.
#[derive(Debug, Parser)]
#[command(name = "memvitalsd", version, about)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Listening socket path, overriding the configuration.
    #[arg(long, value_name = "PATH")]
    socket: Option<String>,

    /// Print the effective configuration as YAML and exit.
    #[arg(long)]
    print_config: bool,
}

/// Initialize tracing/logging based on configuration
fn init_logging(config: &AgentConfig) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    // Build filter from environment or config
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    // If log file is configured, add file layer
    if !config.log_file.is_empty() {
        let log_path = Path::new(&config.log_file);
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        if let (Some(dir), Some(file_name)) = (log_path.parent(), log_path.file_name()) {
            let file_appender = tracing_appender::rolling::daily(dir, file_name);

            if config.log_format == LogFormat::Json {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().json())
                    .with(fmt::layer().json().with_writer(file_appender).with_ansi(false))
                    .init();
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().pretty())
                    .with(fmt::layer().json().with_writer(file_appender).with_ansi(false))
                    .init();
            }
            return;
        }
    }

    // Stdout only
    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (before logging init)
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let mut config = AgentConfig::load_from_path(&config_path.to_string_lossy());

    if let Some(socket) = cli.socket {
        config.socket_path = socket;
    }

    if let Err(e) = config.validate() {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    }

    if cli.print_config {
        print!("{}", config.to_yaml()?);
        return Ok(());
    }

    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config_path = %config_path.display(),
        socket_path = %config.socket_path,
        "memvitals agent starting"
    );

    debug!(?config, "Configuration loaded");

    let source = Arc::new(HostMemorySource::new(config.low_mem_threshold_percent));
    let handler = Arc::new(QueryHandler::new(source));
    let server = QueryServer::bind(Path::new(&config.socket_path), handler)?;

    tokio::select! {
        res = server.run() => {
            if let Err(e) = res {
                error!(error = %e, "Server loop failed");
            }
        }
        res = wait_for_shutdown_signal() => {
            match res {
                Ok(()) => info!("Shutdown signal received. Exiting agent gracefully."),
                Err(e) => error!(error = %e, "Shutdown signal handler failed"),
            }
        }
    }

    server.cleanup();
    info!("memvitals agent stopped");

    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn wait_for_shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT");
        }
    }

    Ok(())
}
