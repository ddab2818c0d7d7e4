//! Notification dispatch worker.
//!
//! A 1-second tick drains the pending queue, groups envelopes by IP, and
//! runs the per-IP delivery protocol: send everything in parallel, then
//! reconcile. One success anywhere in a group absorbs its siblings'
//! failures. Only when an entire group fails are the still-retriable
//! envelopes requeued at the tail.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::engine::Engine;
use crate::notifier::Notifier;
use crate::queue::Envelope;

/// Delivery backend for one envelope. Abstracted so the dispatch protocol
/// can be exercised without network I/O.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnvelopeSender: Send + Sync {
    async fn send(&self, envelope: &Envelope) -> Result<()>;
}

/// Production sender: construct the adapter named by the envelope's policy
/// and deliver over HTTP.
pub struct HttpSender {
    client: reqwest::Client,
}

impl HttpSender {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("riskwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl EnvelopeSender for HttpSender {
    async fn send(&self, envelope: &Envelope) -> Result<()> {
        let notifier = Notifier::from_policy(&envelope.policy)?;
        notifier
            .send(&self.client, &envelope.title, &envelope.body)
            .await
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    engine: Arc<Engine>,
    sender: Arc<dyn EnvelopeSender>,
}

impl Dispatcher {
    pub fn new(engine: Arc<Engine>, sender: Arc<dyn EnvelopeSender>) -> Self {
        Self { engine, sender }
    }

    /// Tick every second. Each tick processes on its own task so a slow
    /// delivery round never delays the next drain.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("Notification worker started (checking every 1s)");
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let dispatcher = self.clone();
                    tokio::spawn(async move { dispatcher.process_pending().await });
                }
                _ = shutdown.changed() => return,
            }
        }
    }

    /// Drain the queue and run the per-IP protocol for every group.
    pub async fn process_pending(&self) {
        let pending = self.engine.queue.take_all();
        if pending.is_empty() {
            return;
        }
        debug!("Processing {} pending notifications", pending.len());

        let mut groups: HashMap<String, Vec<Envelope>> = HashMap::new();
        for envelope in pending {
            groups.entry(envelope.data.ip.clone()).or_default().push(envelope);
        }

        let max_retry = self.engine.max_retry();
        let group_count = groups.len();
        futures::future::join_all(
            groups
                .into_iter()
                .map(|(ip, group)| self.dispatch_ip_group(ip, group, max_retry)),
        )
        .await;

        debug!("Finished processing notifications for {} IPs", group_count);
    }

    /// Send one IP's envelopes in parallel and reconcile the outcome.
    async fn dispatch_ip_group(&self, ip: String, group: Vec<Envelope>, max_retry: u32) {
        let total = group.len();
        let results = futures::future::join_all(group.into_iter().map(|envelope| async move {
            let result = self.sender.send(&envelope).await;
            (envelope, result)
        }))
        .await;

        let successes = results.iter().filter(|(_, r)| r.is_ok()).count();
        let mut requeue = Vec::new();

        for (mut envelope, result) in results {
            match result {
                Ok(()) => {
                    self.engine.record_sent();
                    info!(
                        "Successfully sent notification [{}] for IP {} (count: {}, list_level: {}, log_level: {})",
                        envelope.policy.service,
                        ip,
                        envelope.data.count,
                        envelope.data.source_list.level,
                        envelope.data.source_log.level
                    );
                }
                Err(e) => {
                    envelope.retry_count += 1;
                    if successes > 0 {
                        warn!(
                            "Failed to send notification [{}] for IP {} (retry {}/{}): {:#} (skipped due to other success)",
                            envelope.policy.service, ip, envelope.retry_count, max_retry, e
                        );
                    } else if envelope.retry_count > max_retry {
                        error!(
                            "Failed to send notification [{}] for IP {} after {} attempts: {:#}",
                            envelope.policy.service, ip, envelope.retry_count, e
                        );
                    } else {
                        warn!(
                            "Failed to send notification [{}] for IP {} (retry {}/{}): {:#}",
                            envelope.policy.service, ip, envelope.retry_count, max_retry, e
                        );
                        requeue.push(envelope);
                    }
                }
            }
        }

        if successes > 0 {
            info!(
                "Notification for IP {} completed: {} success, {} failed (not retrying due to success)",
                ip,
                successes,
                total - successes
            );
        } else if !requeue.is_empty() {
            warn!(
                "All notifications failed for IP {}, re-queuing {} notifications for retry",
                ip,
                requeue.len()
            );
            self.engine.queue.append_all(requeue);
        }
    }
}
