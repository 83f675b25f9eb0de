use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ghgquery::config::GhgQueryConfig;
use ghgquery::server::{self, AppState};

/// Serve the SEEG and SIRENE emission datasets over HTTP.
#[derive(Debug, Parser)]
#[command(name = "ghgquery-server", version)]
struct Args {
    /// TOML configuration file (defaults to GHGQUERY_CONFIG, ./ghgquery.toml, then the user config dir).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen host.
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => GhgQueryConfig::from_file(path)?,
        None => GhgQueryConfig::load_default(),
    };
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let registry = ghgquery::load_registry(&config)?;
    let address = format!("{}:{}", config.server.host, config.server.port);
    let connections = ghgquery::connect_datasets(&registry, config).await?;

    let listener = tokio::net::TcpListener::bind(&address).await?;
    server::serve(listener, AppState::new(registry, connections)).await?;
    Ok(())
}
