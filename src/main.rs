use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use service_core::config::{load_config, ServiceConfig};
use service_core::lifecycle::{build_components, signals, Shutdown};
use service_core::observability::{logging, metrics};
use service_core::security::spawn_cleanup;
use service_core::HttpServer;

#[derive(Parser)]
#[command(name = "service-core")]
#[command(about = "Order service on the resilience and caching core", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Invalid configuration in {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => ServiceConfig::default(),
    };

    logging::init_logging(&config.observability);

    match run(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Service failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        service = %config.service_name,
        version = env!("CARGO_PKG_VERSION"),
        "Starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let components = build_components(config).await?;
    let shutdown = Shutdown::new();

    let cleanup = spawn_cleanup(
        components.limiter.clone(),
        Duration::from_secs(components.config.rate_limit.cleanup_interval_secs),
        shutdown.subscribe(),
    );

    let listener = TcpListener::bind(&components.config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(&components);
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    signals::wait_for_shutdown().await;
    shutdown.trigger();

    server_task.await??;
    let _ = cleanup.await;
    Ok(())
}
