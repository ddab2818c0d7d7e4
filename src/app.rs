//! Task supervision: build an engine's task set and tear it down.
//!
//! Startup order matters: the loaders' initial pass completes before any
//! ingestor runs, so a half-loaded risk group can never produce false
//! negatives during warmup.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::error;

use crate::dispatcher::{Dispatcher, HttpSender};
use crate::engine::Engine;
use crate::{ingest, loader, server};

/// Start every subsystem for this engine generation. Returns after the
/// list-loading barrier with the spawned task handles.
pub async fn start(
    engine: Arc<Engine>,
    shutdown: watch::Receiver<bool>,
) -> Result<Vec<JoinHandle<()>>> {
    let config = engine.config();

    let client = reqwest::Client::builder()
        .user_agent(concat!("riskwatch/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")?;

    let mut handles = loader::start(Arc::clone(&engine), client, shutdown.clone()).await;

    let sender = Arc::new(HttpSender::new().context("Failed to create notification sender")?);
    let dispatcher = Dispatcher::new(Arc::clone(&engine), sender);
    handles.push(tokio::spawn(dispatcher.run(shutdown.clone())));

    handles.extend(ingest::start(&engine, &shutdown));

    if let Some(server_config) = config.server {
        let engine = Arc::clone(&engine);
        let shutdown = shutdown.clone();
        handles.push(tokio::spawn(async move {
            if let Err(e) = server::run(engine, server_config.listen, shutdown).await {
                error!("{:#}", e);
            }
        }));
    }

    Ok(handles)
}

/// Signal shutdown and wait for the tasks, aborting stragglers.
pub async fn stop(stop: watch::Sender<bool>, handles: Vec<JoinHandle<()>>) {
    let _ = stop.send(true);
    for mut handle in handles {
        if tokio::time::timeout(Duration::from_secs(5), &mut handle)
            .await
            .is_err()
        {
            handle.abort();
        }
    }
}
