//! Logging setup: tracing subscriber with a reloadable level filter.
//!
//! The filter handle survives config hot-reload, so a changed
//! `logging.level` takes effect without re-installing the subscriber.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter, Registry};

use crate::config::Logging;

/// Handle to the installed level filter.
pub struct LogHandle {
    handle: reload::Handle<EnvFilter, Registry>,
}

impl LogHandle {
    pub fn set_level(&self, level: &str) {
        if let Err(e) = self.handle.reload(EnvFilter::new(level)) {
            tracing::error!("Failed to update log level: {}", e);
        }
    }
}

/// Effective level after CLI overrides.
pub fn effective_level<'a>(logging: &'a Logging, verbose: bool, quiet: bool) -> &'a str {
    if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        logging.level.as_str()
    }
}

/// Install the global subscriber. When `logging.to` names a file, output
/// goes through a non-blocking appender whose guard must stay alive for
/// the process lifetime.
pub fn init(logging: &Logging, verbose: bool, quiet: bool) -> Result<(LogHandle, Option<WorkerGuard>)> {
    let level = effective_level(logging, verbose, quiet);
    let (filter, handle) = reload::Layer::new(EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    let guard = if logging.to.is_empty() {
        registry
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .context("Failed to install logger")?;
        None
    } else {
        let path = Path::new(&logging.to);
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let file = path.file_name().unwrap_or_else(|| "riskwatch.log".as_ref());
        let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file));
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false),
            )
            .try_init()
            .context("Failed to install logger")?;
        Some(guard)
    };

    Ok((LogHandle { handle }, guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_level_overrides() {
        let logging = Logging {
            level: "warn".to_string(),
            to: String::new(),
        };
        assert_eq!(effective_level(&logging, false, false), "warn");
        assert_eq!(effective_level(&logging, true, false), "debug");
        assert_eq!(effective_level(&logging, false, true), "error");
        // verbose wins over quiet
        assert_eq!(effective_level(&logging, true, true), "debug");
    }
}
