//! riskwatch - Risk-IP Log Watcher
//!
//! Scans log files for risk-listed IPv4 addresses and alerts through
//! configured notification services.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use riskwatch::{app, logging, signal, watcher, Cli, Config, Engine};

enum Next {
    Reload(Config),
    Shutdown,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("riskwatch {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let mut config = Config::load(&cli.config)?;
    let (log_handle, _log_guard) = logging::init(&config.logging, cli.verbose, cli.quiet)?;

    // Hot reload is best-effort; a failing watcher leaves a static config.
    let (_config_watcher, _reload_keepalive, mut reload_rx) =
        match watcher::watch_config(&cli.config) {
            Ok((watcher, rx)) => (Some(watcher), None, rx),
            Err(e) => {
                warn!("Config hot-reload disabled: {:#}", e);
                let (tx, rx) = mpsc::unbounded_channel::<()>();
                (None, Some(tx), rx)
            }
        };

    loop {
        let engine = Engine::new(config.clone());
        let (stop_tx, stop_rx) = watch::channel(false);
        let handles = app::start(Arc::clone(&engine), stop_rx).await?;
        info!("riskwatch {} running", env!("CARGO_PKG_VERSION"));

        let next = loop {
            tokio::select! {
                _ = signal::shutdown_requested() => break Next::Shutdown,
                Some(()) = reload_rx.recv() => {
                    info!("Config file changed, reloading...");
                    match Config::load(&cli.config) {
                        Ok(new_config) => break Next::Reload(new_config),
                        // the running config stays in effect
                        Err(e) => error!("Failed to reload config: {:#}", e),
                    }
                }
            }
        };

        app::stop(stop_tx, handles).await;

        match next {
            Next::Shutdown => return Ok(()),
            Next::Reload(new_config) => {
                log_handle.set_level(logging::effective_level(
                    &new_config.logging,
                    cli.verbose,
                    cli.quiet,
                ));
                config = new_config;
                info!("Config reloaded successfully");
            }
        }
    }
}
