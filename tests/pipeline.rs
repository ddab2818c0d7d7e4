//! End-to-end pipeline tests: config -> loader -> ingest -> accumulator
//! -> queue -> dispatcher, with a scripted sender in place of real
//! notification services.

use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;

use riskwatch::config::{Config, TargetLogConfig};
use riskwatch::dispatcher::{Dispatcher, EnvelopeSender};
use riskwatch::engine::Engine;
use riskwatch::ingest;
use riskwatch::ip::parse_ipv4;
use riskwatch::loader;
use riskwatch::queue::Envelope;

/// Sender that succeeds for a fixed set of services and records every
/// attempt.
struct ScriptedSender {
    ok_services: HashSet<String>,
    attempts: Mutex<Vec<String>>,
}

impl ScriptedSender {
    fn new(ok_services: &[&str]) -> Self {
        Self {
            ok_services: ok_services.iter().map(|s| s.to_string()).collect(),
            attempts: Mutex::new(Vec::new()),
        }
    }

    fn attempt_count(&self) -> usize {
        self.attempts.lock().len()
    }
}

#[async_trait]
impl EnvelopeSender for ScriptedSender {
    async fn send(&self, envelope: &Envelope) -> Result<()> {
        self.attempts.lock().push(envelope.policy.service.clone());
        if self.ok_services.contains(&envelope.policy.service) {
            Ok(())
        } else {
            anyhow::bail!("scripted failure for {}", envelope.policy.service)
        }
    }
}

fn load_config(yaml: &str) -> Config {
    let mut config: Config = serde_yaml::from_str(yaml).unwrap();
    config.validate().unwrap();
    config
}

async fn engine_from(yaml: &str) -> Arc<Engine> {
    let engine = Engine::new(load_config(yaml));
    let (_tx, rx) = watch::channel(false);
    let handles = loader::start(Arc::clone(&engine), reqwest::Client::new(), rx).await;
    assert!(handles.is_empty(), "inline lists spawn no refresh tasks");
    engine
}

fn write_log(lines: &[&str]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file.flush().unwrap();
    file
}

fn target_for(file: &tempfile::NamedTempFile) -> TargetLogConfig {
    TargetLogConfig {
        name: "auth".to_string(),
        path: file.path().to_string_lossy().into_owned(),
        ..TargetLogConfig::default()
    }
}

#[tokio::test]
async fn trie_match_and_miss() {
    let engine = engine_from(
        r#"
risk_list:
  - name: t1
    ips: ["10.0.0.0/8"]
    level: 1
"#,
    )
    .await;

    let hit = engine.is_sensitive(parse_ipv4("10.1.2.3").unwrap()).unwrap();
    assert_eq!(hit.name, "t1");
    assert_eq!(hit.level, 1);
    assert!(engine.is_sensitive(parse_ipv4("11.0.0.1").unwrap()).is_none());
}

#[tokio::test]
async fn safelist_wins_over_risk_match() {
    let engine = engine_from(
        r#"
safe_list:
  - name: lan
    ips: ["10.0.0.0/8"]
risk_list:
  - name: feed
    ips: ["10.1.2.3"]
    level: 3
"#,
    )
    .await;

    assert!(engine.is_sensitive(parse_ipv4("10.1.2.3").unwrap()).is_none());
}

#[tokio::test]
async fn once_scan_thresholds_then_clears() {
    let engine = engine_from(
        r#"
risk_list:
  - name: feed
    ips: ["10.1.2.3"]
    level: 1
notifications:
  services:
    - service: webhook
      threshold: 3
      payload_template: '{"ip": "{{.IP}}", "count": {{.Count}}}'
      config:
        url: https://example.com/hook
"#,
    )
    .await;

    let log = write_log(&[
        "login failed from 10.1.2.3",
        "login failed from 10.1.2.3",
        "login failed from 10.1.2.3",
        "login failed from 10.1.2.3",
        "login failed from 10.1.2.3",
    ]);
    ingest::scan_once(&engine, &target_for(&log)).await.unwrap();

    let envelopes = engine.queue.take_all();
    assert_eq!(envelopes.len(), 1);
    assert_eq!(envelopes[0].data.count, 5);
    assert_eq!(
        envelopes[0].body,
        r#"{"ip": "10.1.2.3", "count": 5}"#
    );
    assert!(engine.hits.is_empty(), "once scan leaves no state behind");
}

#[tokio::test]
async fn level_gate_suppresses_low_risk_feeds() {
    let engine = engine_from(
        r#"
risk_list:
  - name: feed
    ips: ["10.1.2.3"]
    level: 2
notifications:
  services:
    - service: webhook
      threshold: 1
      risk_level: 5
      payload_template: "{{.IP}}"
      config:
        url: https://example.com/hook
"#,
    )
    .await;

    let lines: Vec<String> = (0..100)
        .map(|i| format!("probe {} from 10.1.2.3", i))
        .collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let log = write_log(&refs);
    ingest::scan_once(&engine, &target_for(&log)).await.unwrap();

    assert!(engine.queue.is_empty());
}

#[tokio::test]
async fn dispatcher_success_absorbs_failures() {
    let engine = engine_from(
        r##"
risk_list:
  - name: feed
    ips: ["10.1.2.3"]
    level: 1
notifications:
  services:
    - service: slack
      threshold: 1
      payload_template: "{{.IP}}"
      config: { token: t, channel: "#alerts" }
    - service: discord
      threshold: 1
      payload_template: "{{.IP}}"
      config: { token: t, channel: "1" }
    - service: webhook
      threshold: 1
      payload_template: "{{.IP}}"
      config: { url: "https://example.com/hook" }
"##,
    )
    .await;

    let log = write_log(&["hit from 10.1.2.3"]);
    ingest::scan_once(&engine, &target_for(&log)).await.unwrap();
    assert_eq!(engine.queue.len(), 3);

    let sender = Arc::new(ScriptedSender::new(&["slack"]));
    let dispatcher = Dispatcher::new(Arc::clone(&engine), Arc::clone(&sender) as Arc<dyn EnvelopeSender>);
    dispatcher.process_pending().await;

    assert_eq!(sender.attempt_count(), 3);
    assert_eq!(engine.notifications_sent(), 1);
    assert!(
        engine.queue.is_empty(),
        "one success absorbs the sibling failures"
    );
}

#[tokio::test]
async fn dispatcher_total_failure_retries_then_drops() {
    let engine = engine_from(
        r#"
risk_list:
  - name: feed
    ips: ["10.9.9.9"]
    level: 1
notifications:
  retry_count: 2
  services:
    - service: webhook
      threshold: 1
      payload_template: "{{.IP}}"
      config: { url: "https://example.com/hook" }
"#,
    )
    .await;

    let log = write_log(&["hit from 10.9.9.9"]);
    ingest::scan_once(&engine, &target_for(&log)).await.unwrap();
    assert_eq!(engine.queue.len(), 1);

    let sender = Arc::new(ScriptedSender::new(&[]));
    let dispatcher = Dispatcher::new(Arc::clone(&engine), Arc::clone(&sender) as Arc<dyn EnvelopeSender>);

    dispatcher.process_pending().await;
    assert_eq!(engine.queue.len(), 1, "first failure is requeued");
    dispatcher.process_pending().await;
    assert_eq!(engine.queue.len(), 1, "second failure is requeued");
    dispatcher.process_pending().await;
    assert!(engine.queue.is_empty(), "third failure exhausts the budget");

    assert_eq!(sender.attempt_count(), 3);
    assert_eq!(engine.notifications_sent(), 0);
}

#[tokio::test]
async fn tail_style_counts_increase_from_threshold() {
    let engine = engine_from(
        r#"
risk_list:
  - name: feed
    ips: ["10.1.2.3"]
    level: 1
notifications:
  services:
    - service: webhook
      threshold: 3
      payload_template: "{{.Count}}"
      config: { url: "https://example.com/hook" }
"#,
    )
    .await;

    let log_info = riskwatch::netlist::ListInfo::new("auth", 1);
    let mut seen_counts = Vec::new();

    // two bursts; per-IP state resets after each enqueue
    for _ in 0..2 {
        for _ in 0..3 {
            ingest::process_line(&engine, "hit from 10.1.2.3", &log_info);
            engine.drain_hits(false);
        }
        for envelope in engine.queue.take_all() {
            seen_counts.push(envelope.data.count);
        }
    }

    assert_eq!(seen_counts, vec![3, 3]);
}
