use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use fragment_gateway::config::{load_config, ComposerConfig, ConfigWatcher};
use fragment_gateway::lifecycle::{wait_for_termination, Shutdown};
use fragment_gateway::observability::{logging, metrics};
use fragment_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "fragment-gateway")]
#[command(about = "Composes HTML pages from upstream fragments", long_about = None)]
struct Cli {
    /// TOML configuration file; watched for page changes.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ComposerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "fragment-gateway starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        request_timeout_secs = config.timeouts.request_secs,
        pages = config.pages.len(),
        cache = config.cache.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config);
    let shutdown = Shutdown::new();

    // dropping the watcher handle stops watching, keep it alive until exit
    let _watcher = match &cli.config {
        Some(path) => {
            let (watcher, mut updates) = ConfigWatcher::new(path);
            let pages = server.pages();
            let mut stop = shutdown.subscribe();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        Some(config) = updates.recv() => pages.reload(config.pages),
                        _ = stop.recv() => break,
                        else => break,
                    }
                }
            });
            Some(watcher.run()?)
        }
        None => None,
    };

    let signal = shutdown.signal();
    tokio::spawn(async move {
        wait_for_termination().await;
        shutdown.trigger();
    });

    server.run(listener, signal).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
