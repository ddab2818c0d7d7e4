//! Log ingestion: scan or follow target files and report sensitive hits.
//!
//! Every target log runs its own task. `once` mode re-reads the whole
//! file every `read_interval` and drains the accumulator with fresh-scan
//! semantics. `tail` mode follows the file from its current end and
//! drains after every line, so floods alert as soon as the threshold is
//! crossed.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use linemux::MuxedLines;
use tokio::io::AsyncBufReadExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{ReadMode, TargetLogConfig};
use crate::engine::Engine;
use crate::ip::{extract_ipv4, format_ipv4};
use crate::netlist::ListInfo;

/// Spawn one ingestor task per configured target log.
pub fn start(engine: &Arc<Engine>, shutdown: &watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
    engine
        .config()
        .target_logs
        .into_iter()
        .map(|target| {
            let engine = Arc::clone(engine);
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                match target.read_mode {
                    ReadMode::Once => run_once_mode(engine, target, shutdown).await,
                    ReadMode::Tail => run_tail_mode(engine, target, shutdown).await,
                }
            })
        })
        .collect()
}

/// Process a line: extract the first IPv4 literal, consult the oracle,
/// and record a hit when the address is sensitive.
pub fn process_line(engine: &Engine, line: &str, log_info: &ListInfo) {
    let Some(ip) = extract_ipv4(line) else {
        return;
    };
    if let Some(list_info) = engine.is_sensitive(ip) {
        warn!(
            "Found sensitive IP {} from {} in line: {}",
            format_ipv4(ip),
            list_info.name,
            line
        );
        engine.hits.add(ip, log_info, &list_info);
    }
}

/// One complete pass over the file, then a fresh-scan drain.
///
/// A missing file skips the cycle; the next interval looks again.
pub async fn scan_once(engine: &Engine, target: &TargetLogConfig) -> Result<()> {
    let log_info = ListInfo::new(target.name.clone(), target.level);
    let path = Path::new(&target.path);
    if !path.exists() {
        warn!(
            "File {} does not exist, skipping this read cycle",
            target.path
        );
        return Ok(());
    }

    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open file {}", target.path))?;
    let mut lines = tokio::io::BufReader::new(file).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .with_context(|| format!("Error reading file {}", target.path))?
    {
        process_line(engine, &line, &log_info);
    }

    engine.drain_hits(true);

    if target.clean_after_read {
        tokio::fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(path)
            .await
            .with_context(|| format!("Failed to truncate file {}", target.path))?;
        info!("File {} truncated after read", target.path);
    }
    Ok(())
}

async fn run_once_mode(
    engine: Arc<Engine>,
    target: TargetLogConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let interval = target.read_interval();
    loop {
        if let Err(e) = scan_once(&engine, &target).await {
            error!("{:#}", e);
        }
        debug!("Next read for {} after {:?}", target.name, interval);
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => return,
        }
    }
}

async fn run_tail_mode(
    engine: Arc<Engine>,
    target: TargetLogConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let log_info = ListInfo::new(target.name.clone(), target.level);
    loop {
        // Wait until the file exists before attaching the follower.
        while !Path::new(&target.path).exists() {
            warn!("File {} does not exist, retrying in 1 second...", target.path);
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                _ = shutdown.changed() => return,
            }
        }

        let mut lines = match follow(&target.path).await {
            Ok(lines) => lines,
            Err(e) => {
                error!(
                    "Failed to tail file {}: {:#}, retrying in 1 second...",
                    target.path, e
                );
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(1)) => continue,
                    _ = shutdown.changed() => return,
                }
            }
        };

        loop {
            tokio::select! {
                next = lines.next_line() => match next {
                    Ok(Some(line)) => {
                        debug!(
                            "Read line from {}, level: {}, line: {}",
                            target.name,
                            log_info.level,
                            line.line()
                        );
                        process_line(&engine, line.line(), &log_info);
                        engine.drain_hits(false);
                    }
                    Ok(None) => break,
                    Err(e) => {
                        error!("Error reading line from {}: {}", target.path, e);
                        break;
                    }
                },
                _ = shutdown.changed() => return,
            }
        }

        // The follower ended (file deleted or rotation it could not
        // recover from). Counts from before the gap must not alert later.
        engine.hits.discard_log(&target.name);
        warn!("Tail for {} ended, will retry with fresh state...", target.path);
    }
}

/// Attach a rotation-aware follower starting at the file's current end.
async fn follow(path: &str) -> Result<MuxedLines> {
    let mut lines = MuxedLines::new().context("Failed to create line follower")?;
    lines
        .add_file(path)
        .await
        .with_context(|| format!("Failed to follow {}", path))?;
    Ok(lines)
}
