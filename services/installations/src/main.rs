use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use eyre::WrapErr as _;
use installations::ServerConfig;
use tracing_subscriber::EnvFilter;

/// Serve the installations of any Github App which presents its credentials.
#[derive(Debug, Parser)]
#[command(name = "installations-server", version)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long, env = "INSTALLATIONS_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the configuration
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind = bind;
    }

    let app = config.state()?.router();

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .wrap_err_with(|| format!("binding {}", config.bind))?;
    tracing::info!("Listening on http://{}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!("Unable to listen for Ctrl-C: {error}");
        std::future::pending::<()>().await;
    }

    tracing::info!("Shutdown signal received");
}
