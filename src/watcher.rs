//! Config-file change watcher driving hot reload.

use std::path::Path;

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Watch `path` for writes. Returns the watcher (keep it alive) and a
/// channel that fires on every write event.
pub fn watch_config(path: &Path) -> Result<(RecommendedWatcher, mpsc::UnboundedReceiver<()>)> {
    let (tx, rx) = mpsc::unbounded_channel();

    let mut watcher = RecommendedWatcher::new(
        move |result: notify::Result<Event>| match result {
            Ok(event) => {
                if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    debug!("Config file event: {:?}", event.kind);
                    let _ = tx.send(());
                }
            }
            Err(e) => error!("Config watcher error: {}", e),
        },
        notify::Config::default(),
    )
    .context("Failed to create file watcher")?;

    watcher
        .watch(path, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch config file {:?}", path))?;
    info!("Started watching config file for changes");

    Ok((watcher, rx))
}
