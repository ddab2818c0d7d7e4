//! Feed loading: populate and refresh the list groups.
//!
//! Each configured feed is loaded from one of three sources. Inline `ips`
//! are parsed synchronously at startup. `file` and `url` sources get a
//! long-lived task: one initial load (the startup barrier waits for all
//! of them), then a refresh every `update_interval`. A failed refresh
//! keeps the previously published list; the next interval tries again.

use anyhow::{Context, Result};
use ipnet::Ipv4Net;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{IpListConfig, ListFormat};
use crate::engine::{Engine, GroupKind};
use crate::ip::{format_ipv4, parse_ipv4};
use crate::netlist::ListInfo;

/// Parsed content of one feed: bare addresses and CIDR prefixes.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedList {
    pub ips: Vec<u32>,
    pub cidrs: Vec<(u32, u8)>,
}

/// Parse feed entries: a token containing `/` is a CIDR, anything else an
/// IPv4 address. Malformed entries are logged and skipped.
pub fn parse_entries<'a>(entries: impl IntoIterator<Item = &'a str>) -> ParsedList {
    let mut parsed = ParsedList::default();
    for entry in entries {
        let entry = entry.trim();
        if entry.is_empty() || entry.starts_with('#') {
            continue;
        }
        if entry.contains('/') {
            match entry.parse::<Ipv4Net>() {
                Ok(net) => parsed.cidrs.push((u32::from(net.addr()), net.prefix_len())),
                Err(_) => warn!("Invalid CIDR: {}, skipping", entry),
            }
        } else {
            match parse_ipv4(entry) {
                Ok(ip) => parsed.ips.push(ip),
                Err(_) => warn!("Invalid IP: {}, skipping", entry),
            }
        }
    }
    parsed
}

/// Parse a feed body according to its configured format.
pub fn parse_content(
    format: ListFormat,
    body: &str,
    csv_column: Option<&str>,
    json_path: Option<&str>,
) -> Result<ParsedList> {
    match format {
        ListFormat::Text => Ok(parse_entries(body.lines())),
        ListFormat::Csv => parse_csv(body, csv_column.unwrap_or_default()),
        ListFormat::Json => parse_json(body, json_path.unwrap_or_default()),
    }
}

/// CSV with a header row; entries come from the named column. Cells are
/// split on commas without quote handling, which covers the feeds in the
/// wild (plain address columns).
fn parse_csv(body: &str, column: &str) -> Result<ParsedList> {
    let mut lines = body.lines();
    let header = lines.next().unwrap_or_default();
    let index = header
        .split(',')
        .position(|h| h.trim() == column)
        .with_context(|| format!("column {} not found", column))?;

    let cells: Vec<&str> = lines
        .filter_map(|line| line.split(',').nth(index))
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .collect();
    Ok(parse_entries(cells))
}

/// JSON object whose value at the top-level key `path` is an array of
/// address strings.
fn parse_json(body: &str, path: &str) -> Result<ParsedList> {
    let value: serde_json::Value =
        serde_json::from_str(body).context("Failed to parse JSON body")?;
    let entries = value
        .get(path)
        .and_then(|v| v.as_array())
        .with_context(|| format!("path {} not found or not an array", path))?;

    let strings: Vec<&str> = entries.iter().filter_map(|v| v.as_str()).collect();
    Ok(parse_entries(strings))
}

/// Download a feed body with the list's timeout and retry budget.
/// Retries back off linearly: 1s before the second attempt, 2s before the
/// third, and so on.
pub async fn fetch(client: &Client, list: &IpListConfig) -> Result<String> {
    let url = list.url.as_deref().unwrap_or_default();
    let attempts = list.retry_count.max(1);
    let mut last_error = None;

    for attempt in 0..attempts {
        if attempt > 0 {
            let delay = Duration::from_secs(attempt as u64);
            debug!("Retry {} after {:?} for {}", attempt, delay, url);
            tokio::time::sleep(delay).await;
        }

        let mut request = client.get(url).timeout(list.timeout());
        for (key, value) in &list.custom_headers {
            request = request.header(key.as_str(), value.as_str());
        }

        match request.send().await {
            Ok(response) => {
                if response.status().is_success() {
                    return response.text().await.context("Failed to read response body");
                }
                last_error = Some(anyhow::anyhow!("HTTP {}", response.status()));
            }
            Err(e) => last_error = Some(e.into()),
        }
    }

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("no attempts made")))
}

/// Load one `file`/`url` feed and publish it into its group.
pub async fn load_once(
    client: &Client,
    list: &IpListConfig,
    engine: &Engine,
    kind: GroupKind,
) -> Result<()> {
    let body = if let Some(path) = &list.file {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read list file {}", path))?
    } else {
        fetch(client, list).await?
    };

    let parsed = parse_content(
        list.format,
        &body,
        list.csv_column.as_deref(),
        list.json_path.as_deref(),
    )?;

    info!(
        "Loaded {} IPs and {} CIDRs from [{}] {}",
        parsed.ips.len(),
        parsed.cidrs.len(),
        kind.as_str(),
        list.name
    );
    if tracing::enabled!(tracing::Level::DEBUG) && !parsed.ips.is_empty() {
        debug!("Top 10 IPs from {}:", list.name);
        for ip in parsed.ips.iter().take(10) {
            debug!(" - {}", format_ipv4(*ip));
        }
    }

    engine.group(kind).add(
        ListInfo::new(list.name.clone(), list.level),
        parsed.ips,
        &parsed.cidrs,
    );
    Ok(())
}

/// Run every feed's initial load, then spawn refresh loops.
///
/// Returns only after each `file`/`url` feed has completed its first load
/// attempt (success or failure), so ingestors never consult half-empty
/// groups during warmup.
pub async fn start(
    engine: Arc<Engine>,
    client: Client,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    let config = engine.config();
    let mut initial = Vec::new();
    let mut refreshers: Vec<(IpListConfig, GroupKind)> = Vec::new();

    for (kind, lists) in [
        (GroupKind::Safe, config.safe_list),
        (GroupKind::Risk, config.risk_list),
    ] {
        for list in lists {
            if !list.ips.is_empty() {
                let entries: Vec<&str> = list.ips.iter().map(String::as_str).collect();
                let parsed = parse_entries(entries);
                info!(
                    "Loaded {} IPs and {} CIDRs from manual list [{}] {}",
                    parsed.ips.len(),
                    parsed.cidrs.len(),
                    kind.as_str(),
                    list.name
                );
                engine.group(kind).add(
                    ListInfo::new(list.name.clone(), list.level),
                    parsed.ips,
                    &parsed.cidrs,
                );
            } else {
                let engine = Arc::clone(&engine);
                let client = client.clone();
                let task_list = list.clone();
                initial.push(async move {
                    if let Err(e) = load_once(&client, &task_list, &engine, kind).await {
                        error!("Failed initial load of {}: {:#}", task_list.name, e);
                    }
                });
                if !list.update_interval().is_zero() {
                    refreshers.push((list, kind));
                }
            }
        }
    }

    info!("Waiting for IP lists to load...");
    futures::future::join_all(initial).await;
    info!("IP lists loaded");

    refreshers
        .into_iter()
        .map(|(list, kind)| {
            let engine = Arc::clone(&engine);
            let client = client.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(refresh_loop(engine, client, list, kind, shutdown))
        })
        .collect()
}

async fn refresh_loop(
    engine: Arc<Engine>,
    client: Client,
    list: IpListConfig,
    kind: GroupKind,
    mut shutdown: watch::Receiver<bool>,
) {
    let interval = list.update_interval();
    loop {
        debug!(
            "Next update for {} ({}) after {:?}",
            list.name,
            kind.as_str(),
            interval
        );
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => return,
        }
        if let Err(e) = load_once(&client, &list, &engine, kind).await {
            // keep the previously published list; the next interval retries
            error!("Failed to refresh {}: {:#}", list.name, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn ip(s: &str) -> u32 {
        parse_ipv4(s).unwrap()
    }

    #[test]
    fn test_parse_entries_mixed() {
        let parsed = parse_entries([
            "# comment",
            "",
            "10.1.2.3",
            "172.16.0.0/12",
            "  192.168.1.1  ",
        ]);
        assert_eq!(parsed.ips, vec![ip("10.1.2.3"), ip("192.168.1.1")]);
        assert_eq!(parsed.cidrs, vec![(ip("172.16.0.0"), 12)]);
    }

    #[test]
    fn test_parse_entries_skips_invalid() {
        let parsed = parse_entries(["not-an-ip", "10.0.0.0/40", "1.2.3.4", "300.0.0.1"]);
        assert_eq!(parsed.ips, vec![ip("1.2.3.4")]);
        assert!(parsed.cidrs.is_empty());
    }

    #[test]
    fn test_parse_text_format() {
        let body = "# feed\n10.1.2.3\n10.0.0.0/8\n\n# more\n172.16.0.1\n";
        let parsed = parse_content(ListFormat::Text, body, None, None).unwrap();
        assert_eq!(parsed.ips.len(), 2);
        assert_eq!(parsed.cidrs.len(), 1);
    }

    #[test]
    fn test_parse_csv_format() {
        let body = "rank,address,score\n1,10.1.2.3,9\n2,,5\n3,10.0.0.0/8,7\n";
        let parsed = parse_content(ListFormat::Csv, body, Some("address"), None).unwrap();
        assert_eq!(parsed.ips, vec![ip("10.1.2.3")]);
        assert_eq!(parsed.cidrs, vec![(ip("10.0.0.0"), 8)]);
    }

    #[test]
    fn test_parse_csv_missing_column() {
        let body = "rank,address\n1,10.1.2.3\n";
        assert!(parse_content(ListFormat::Csv, body, Some("ip"), None).is_err());
    }

    #[test]
    fn test_parse_json_format() {
        let body = r#"{"count": 2, "addresses": ["10.1.2.3", "10.0.0.0/8", "bogus"]}"#;
        let parsed = parse_content(ListFormat::Json, body, None, Some("addresses")).unwrap();
        assert_eq!(parsed.ips, vec![ip("10.1.2.3")]);
        assert_eq!(parsed.cidrs, vec![(ip("10.0.0.0"), 8)]);
    }

    #[test]
    fn test_parse_json_bad_path() {
        let body = r#"{"addresses": ["10.1.2.3"]}"#;
        assert!(parse_content(ListFormat::Json, body, None, Some("ips")).is_err());
        let body = r#"{"addresses": "not-an-array"}"#;
        assert!(parse_content(ListFormat::Json, body, None, Some("addresses")).is_err());
        assert!(parse_content(ListFormat::Json, "not json", None, Some("x")).is_err());
    }

    #[tokio::test]
    async fn test_load_once_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "10.1.2.3\n10.0.0.0/8").unwrap();

        let engine = Engine::new(Config::default());
        let list = IpListConfig {
            name: "local".to_string(),
            file: Some(file.path().to_string_lossy().into_owned()),
            level: 2,
            ..IpListConfig::default()
        };

        let client = Client::new();
        load_once(&client, &list, &engine, GroupKind::Risk)
            .await
            .unwrap();

        assert_eq!(
            engine.risk_list.contains(ip("10.1.2.3")),
            Some(ListInfo::new("local", 2))
        );
        assert_eq!(
            engine.risk_list.contains(ip("10.99.0.1")),
            Some(ListInfo::new("local", 2))
        );
    }

    #[tokio::test]
    async fn test_load_once_missing_file_fails() {
        let engine = Engine::new(Config::default());
        let list = IpListConfig {
            name: "gone".to_string(),
            file: Some("/nonexistent/feed.txt".to_string()),
            ..IpListConfig::default()
        };
        let client = Client::new();
        assert!(load_once(&client, &list, &engine, GroupKind::Risk)
            .await
            .is_err());
        // nothing was published
        assert!(engine.risk_list.is_empty());
    }

    #[tokio::test]
    async fn test_start_publishes_manual_lists_before_returning() {
        let mut config = Config::default();
        config.safe_list.push(IpListConfig {
            name: "lan".to_string(),
            ips: vec!["192.168.0.0/16".to_string()],
            level: 0,
            ..IpListConfig::default()
        });
        config.risk_list.push(IpListConfig {
            name: "feed".to_string(),
            ips: vec!["10.1.2.3".to_string()],
            level: 1,
            ..IpListConfig::default()
        });

        let engine = Engine::new(config);
        let (_tx, rx) = watch::channel(false);
        let handles = start(Arc::clone(&engine), Client::new(), rx).await;

        // manual lists never need refresh tasks
        assert!(handles.is_empty());
        assert!(engine.safe_list.contains(ip("192.168.5.5")).is_some());
        assert_eq!(engine.is_sensitive(ip("10.1.2.3")), Some(ListInfo::new("feed", 1)));
    }
}
