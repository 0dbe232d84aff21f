use std::path::PathBuf;

use clap::Parser;
use httpdnsd::config::Config;
use httpdnsd::registration::Registrar;
use httpdnsd::server::{Server, Shutdown, Signals};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// File-serving HTTP daemon with a DNS-over-HTTP relay.
#[derive(Parser)]
#[command(name = "httpdnsd", version)]
struct Cli {
    /// Stay in the foreground (the daemon never detaches itself)
    #[arg(short = 'f')]
    foreground: bool,

    /// Print verbose output
    #[arg(short = 'v')]
    verbose: bool,

    /// YAML configuration file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Port or service name to listen on
    port: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let mut cfg = Config::load(cli.config.as_deref())?;
    cfg.server.port = cli.port;

    debug!(foreground = cli.foreground, "Starting; the process never detaches");

    // Signal handlers must be in place before registration starts.
    let shutdown = Shutdown::new();
    Signals::install()?.forward_to(&shutdown);
    let mut stopped = shutdown.subscribe();

    let server = Server::bind(&cfg).await?;
    let server_task = tokio::spawn(server.run(shutdown.subscribe()));

    let registrar = Registrar::from_config(&cfg);
    match &registrar {
        Some(r) => {
            tokio::select! {
                _ = r.register() => {}
                _ = stopped.recv() => info!("Shutdown requested during registration"),
            }
        }
        None => info!("No directory server configured; skipping registration"),
    }

    server_task.await??;

    if let Some(r) = &registrar {
        r.deregister().await;
    }

    Ok(())
}
