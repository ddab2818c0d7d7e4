//! Error types for riskwatch.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid IPv4 address: {0}")]
    InvalidAddress(String),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Unsupported list format: {0}")]
    UnsupportedFormat(String),

    #[error("Unsupported notification service: {0}")]
    UnsupportedService(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Send failed: {0}")]
    Send(String),
}
