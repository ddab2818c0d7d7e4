//! Signal handling for graceful shutdown.

use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

/// Resolve when SIGINT or SIGTERM arrives.
///
/// If signal handlers cannot be registered (restricted environments),
/// falls back to ctrl-c only.
pub async fn shutdown_requested() {
    let sigint = signal(SignalKind::interrupt());
    let sigterm = signal(SignalKind::terminate());

    match (sigint, sigterm) {
        (Ok(mut int), Ok(mut term)) => {
            tokio::select! {
                _ = int.recv() => info!("Received SIGINT, shutting down..."),
                _ = term.recv() => info!("Received SIGTERM, shutting down..."),
            }
        }
        _ => {
            warn!("Failed to register signal handlers, falling back to ctrl-c");
            let _ = tokio::signal::ctrl_c().await;
            info!("Received interrupt, shutting down...");
        }
    }
}
