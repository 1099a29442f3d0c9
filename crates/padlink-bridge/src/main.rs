mod config;
mod framing;
mod message;
mod session;

use anyhow::{Context, Result};
use clap::Parser;
use config::{BridgeConfig, Overrides};
use padlink_bus::Bus;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(
    name = "padlink-bridge",
    version,
    about = "Drive a virtual gamepad from a network client"
)]
struct Cli {
    /// TOML config file.
    #[arg(long, short)]
    config: Option<PathBuf>,
    #[command(flatten)]
    overrides: Overrides,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(true)
        .compact()
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => BridgeConfig::load(path)?,
        None => BridgeConfig::default(),
    };
    cli.overrides.apply(&mut config);
    let config = Arc::new(config);

    let bus = Bus::open_kind(config.backend, config.vigem_library.as_deref())
        .context("failed to open the virtual gamepad bus")?;
    info!(bus = %bus.id(), backend = ?config.backend, pad = %config.pad, "bus ready");

    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to listen on {}", config.listen))?;
    info!(addr = %config.listen, "padlink-bridge listening");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!(error = %e, "accept failed");
                        continue;
                    }
                };
                info!(%peer, "client connected");
                let bus = bus.clone();
                let config = config.clone();
                tokio::spawn(async move {
                    if let Err(e) = session::serve(stream, peer, bus, config).await {
                        error!(%peer, error = %format!("{e:#}"), "client session error");
                    }
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }
    Ok(())
}
