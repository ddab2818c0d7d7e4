//! Configuration management for riskwatch.
//!
//! The YAML layout mirrors the operational model: named safe/risk feeds,
//! target log files, and notification policies. String durations use the
//! `<integer><s|m|h|d>` grammar and are validated up front; after
//! [`Config::validate`] succeeds the typed accessors cannot fail.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::error::WatchError;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Logging level and optional file target
    pub logging: Logging,

    /// Optional status/introspection HTTP server
    pub server: Option<ServerConfig>,

    /// Whitelist feeds (level forced to 0)
    pub safe_list: Vec<IpListConfig>,

    /// Risk feeds (level >= 1)
    pub risk_list: Vec<IpListConfig>,

    /// Log files to scan for risk-listed IPs
    pub target_logs: Vec<TargetLogConfig>,

    /// Notification policies and dispatch retry budget
    pub notifications: Notifications,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Log file path; empty logs to stdout
    pub to: String,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            to: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address, e.g. "127.0.0.1:8466"
    pub listen: String,
}

/// One safe or risk feed. Exactly one of `url`, `file`, `ips` must be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IpListConfig {
    pub name: String,

    pub url: Option<String>,
    pub file: Option<String>,
    pub ips: Vec<String>,

    /// Refresh interval for `url`/`file` sources; "0"/"" loads once
    pub update_interval: String,

    pub format: ListFormat,

    /// Per-request timeout for `url` sources
    pub timeout: String,

    /// Fetch attempts per refresh for `url` sources
    pub retry_count: u32,

    /// Column to read in `csv` format
    pub csv_column: Option<String>,

    /// Top-level key holding the address array in `json` format
    pub json_path: Option<String>,

    pub custom_headers: HashMap<String, String>,

    /// Risk weight; forced to 0 for safe_list entries
    pub level: i32,
}

impl Default for IpListConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            url: None,
            file: None,
            ips: Vec::new(),
            update_interval: "2h".to_string(),
            format: ListFormat::Text,
            timeout: "30s".to_string(),
            retry_count: 3,
            csv_column: None,
            json_path: None,
            custom_headers: HashMap::new(),
            level: 1,
        }
    }
}

impl IpListConfig {
    pub fn update_interval(&self) -> Duration {
        parse_duration(&self.update_interval).unwrap_or(Duration::from_secs(2 * 3600))
    }

    pub fn timeout(&self) -> Duration {
        let timeout = parse_duration(&self.timeout).unwrap_or(Duration::from_secs(30));
        if timeout.is_zero() {
            Duration::from_secs(30)
        } else {
            timeout
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ListFormat {
    #[default]
    Text,
    Csv,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetLogConfig {
    pub name: String,
    pub path: String,
    pub read_mode: ReadMode,
    /// Scan period in `once` mode
    pub read_interval: String,
    /// Truncate the file after each `once` scan
    pub clean_after_read: bool,
    /// Log weight gated against policy `log_level`
    pub level: i32,
}

impl Default for TargetLogConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            path: String::new(),
            read_mode: ReadMode::Once,
            read_interval: "2h".to_string(),
            clean_after_read: false,
            level: 1,
        }
    }
}

impl TargetLogConfig {
    pub fn read_interval(&self) -> Duration {
        let interval = parse_duration(&self.read_interval).unwrap_or(Duration::from_secs(2 * 3600));
        if interval.is_zero() {
            Duration::from_secs(2 * 3600)
        } else {
            interval
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReadMode {
    #[default]
    Once,
    Tail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Notifications {
    /// Delivery attempts per envelope before it is dropped
    pub retry_count: u32,
    pub services: Vec<NotificationPolicy>,
}

impl Default for Notifications {
    fn default() -> Self {
        Self {
            retry_count: 5,
            services: Vec::new(),
        }
    }
}

impl Notifications {
    pub fn max_retry(&self) -> u32 {
        if self.retry_count == 0 {
            5
        } else {
            self.retry_count
        }
    }
}

/// One notification policy: which service to alert, above which thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationPolicy {
    pub service: String,

    /// Minimum hit count before this policy fires
    pub threshold: u32,

    /// Rendered into the notification body
    pub payload_template: String,

    pub payload_title: String,

    /// Minimum target-log level
    pub log_level: i32,

    /// Minimum risk-list level
    pub risk_level: i32,

    /// Service-specific settings, parsed by the matching adapter
    pub config: HashMap<String, serde_yaml::Value>,
}

impl Default for NotificationPolicy {
    fn default() -> Self {
        Self {
            service: String::new(),
            threshold: 5,
            payload_template: String::new(),
            payload_title: "Risk IP Alert".to_string(),
            log_level: 1,
            risk_level: 1,
            config: HashMap::new(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let mut config: Config =
            serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Structural validation. Any failure here is fatal at startup and
    /// rejects the new file at reload.
    pub fn validate(&mut self) -> Result<()> {
        match self.logging.level.as_str() {
            "" => self.logging.level = "info".to_string(),
            "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(WatchError::Config(format!("unknown log level: {}", other)).into());
            }
        }

        validate_lists("safe_list", &mut self.safe_list)?;
        // Whitelist entries always carry weight 0.
        for list in &mut self.safe_list {
            list.level = 0;
        }
        validate_lists("risk_list", &mut self.risk_list)?;
        for list in &self.risk_list {
            if list.level < 1 {
                return Err(WatchError::Config(format!(
                    "risk_list {} level must be >= 1",
                    list.name
                ))
                .into());
            }
        }

        for target in &self.target_logs {
            if target.name.is_empty() {
                return Err(WatchError::Config("target_logs entry without name".into()).into());
            }
            if target.path.is_empty() {
                return Err(
                    WatchError::Config(format!("target log {} has no path", target.name)).into(),
                );
            }
            parse_duration(&target.read_interval).map_err(|e| {
                WatchError::Config(format!("target log {}: {}", target.name, e))
            })?;
        }

        for policy in &self.notifications.services {
            if policy.service.is_empty() {
                return Err(
                    WatchError::Config("notification service entry without service".into()).into(),
                );
            }
            // constructing the adapter parses its typed config
            crate::notifier::Notifier::from_policy(policy)?;
        }

        Ok(())
    }
}

fn validate_lists(kind: &str, lists: &mut [IpListConfig]) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for list in lists.iter_mut() {
        if list.name.is_empty() {
            return Err(WatchError::Config(format!("{} entry without name", kind)).into());
        }
        if !seen.insert(list.name.clone()) {
            return Err(
                WatchError::Config(format!("duplicate {} name: {}", kind, list.name)).into(),
            );
        }

        let sources =
            usize::from(list.url.is_some()) + usize::from(list.file.is_some()) + usize::from(!list.ips.is_empty());
        if sources != 1 {
            return Err(WatchError::Config(format!(
                "{} {} must set exactly one of url/file/ips",
                kind, list.name
            ))
            .into());
        }

        parse_duration(&list.update_interval)
            .map_err(|e| WatchError::Config(format!("{} {}: {}", kind, list.name, e)))?;
        parse_duration(&list.timeout)
            .map_err(|e| WatchError::Config(format!("{} {}: {}", kind, list.name, e)))?;

        match list.format {
            ListFormat::Csv if list.csv_column.is_none() => {
                return Err(WatchError::Config(format!(
                    "{} {} uses csv format but sets no csv_column",
                    kind, list.name
                ))
                .into());
            }
            ListFormat::Json if list.json_path.is_none() => {
                return Err(WatchError::Config(format!(
                    "{} {} uses json format but sets no json_path",
                    kind, list.name
                ))
                .into());
            }
            _ => {}
        }
    }
    Ok(())
}

/// Parse a duration in the `<integer><s|m|h|d>` grammar.
///
/// The empty string parses to zero.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use riskwatch::config::parse_duration;
/// assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
/// assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
/// assert_eq!(parse_duration("").unwrap(), Duration::ZERO);
/// assert!(parse_duration("10x").is_err());
/// ```
pub fn parse_duration(s: &str) -> Result<Duration, WatchError> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(Duration::ZERO);
    }
    if !s.is_ascii() {
        return Err(WatchError::InvalidDuration(s.to_string()));
    }
    let (number, unit) = s.split_at(s.len() - 1);
    let multiplier = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 24 * 3600,
        _ => return Err(WatchError::InvalidDuration(s.to_string())),
    };
    let value: u64 = number
        .parse()
        .map_err(|_| WatchError::InvalidDuration(s.to_string()))?;
    Ok(Duration::from_secs(value.saturating_mul(multiplier)))
}
