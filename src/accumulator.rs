//! Per-IP hit accumulation and threshold evaluation.
//!
//! Ingestors append a [`HitRecord`] for every sensitive-IP sighting;
//! [`HitAccumulator::drain`] evaluates the configured notification
//! policies against the latest record of each IP and enqueues envelopes
//! for the dispatcher. The whole drain runs under one critical section so
//! a concurrent `add` lands either before or after a full evaluation
//! pass, never in the middle.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::config::NotificationPolicy;
use crate::ip::format_ipv4;
use crate::netlist::ListInfo;
use crate::queue::{Envelope, NotificationQueue};
use crate::template::{self, TemplateData};

/// One sighting of a sensitive IP, with provenance.
#[derive(Debug, Clone)]
pub struct HitRecord {
    pub ip: u32,
    /// 1-based index of this record within the IP's sequence.
    pub count: u32,
    pub source_list: ListInfo,
    pub source_log: ListInfo,
    pub timestamp: i64,
}

/// Map of IP to its ordered hit sequence.
#[derive(Default)]
pub struct HitAccumulator {
    hits: Mutex<HashMap<u32, Vec<HitRecord>>>,
}

impl HitAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sighting of `ip` found in `source_log` via `source_list`.
    pub fn add(&self, ip: u32, source_log: &ListInfo, source_list: &ListInfo) {
        let mut hits = self.hits.lock();
        let records = hits.entry(ip).or_default();
        let count = records.len() as u32 + 1;
        records.push(HitRecord {
            ip,
            count,
            source_list: source_list.clone(),
            source_log: source_log.clone(),
            timestamp: Utc::now().timestamp(),
        });
    }

    /// Evaluate policies against every accumulated IP and enqueue matching
    /// envelopes.
    ///
    /// In tail mode (`is_once = false`) an IP's sequence is deleted as soon
    /// as any envelope was enqueued for it, debouncing floods. A `once`
    /// scan clears the whole accumulator at the end so the next scan starts
    /// fresh.
    pub fn drain(
        &self,
        policies: &[NotificationPolicy],
        queue: &NotificationQueue,
        is_once: bool,
    ) {
        let mut hits = self.hits.lock();
        let mut notified: Vec<u32> = Vec::new();

        for (&ip, records) in hits.iter() {
            let Some(latest) = records.last() else {
                continue;
            };
            let ip_str = format_ipv4(ip);
            let data = TemplateData::new(
                ip_str.clone(),
                latest.count,
                latest.source_list.clone(),
                latest.source_log.clone(),
                latest.timestamp,
            );

            let mut enqueued = Vec::new();
            for policy in policies {
                if latest.count < policy.threshold {
                    continue;
                }
                if latest.source_log.level < policy.log_level {
                    debug!(
                        "Skip notification [{}] for IP {}: log_level {} < required {}",
                        policy.service, ip_str, latest.source_log.level, policy.log_level
                    );
                    continue;
                }
                if latest.source_list.level < policy.risk_level {
                    debug!(
                        "Skip notification [{}] for IP {}: risk_level {} < required {}",
                        policy.service, ip_str, latest.source_list.level, policy.risk_level
                    );
                    continue;
                }

                let body = match template::render(&policy.payload_template, &data) {
                    Ok(body) => body,
                    Err(e) => {
                        error!(
                            "Failed to render template for [{}], IP {}: {}",
                            policy.service, ip_str, e
                        );
                        continue;
                    }
                };

                debug!(
                    "Queued notification [{}] for IP {}, log_level: {}, risk_level: {}, count: {}",
                    policy.service,
                    ip_str,
                    latest.source_log.level,
                    latest.source_list.level,
                    latest.count
                );
                enqueued.push(Envelope {
                    policy: policy.clone(),
                    title: policy.payload_title.clone(),
                    body,
                    data: data.clone(),
                    retry_count: 0,
                });
            }

            if !enqueued.is_empty() {
                info!(
                    "Notification queued for IP {} from {}, list_level: {}, log_level: {}, count: {}",
                    ip_str,
                    latest.source_log.name,
                    latest.source_list.level,
                    latest.source_log.level,
                    latest.count
                );
                queue.append_all(enqueued);
                if !is_once {
                    notified.push(ip);
                }
            }
        }

        for ip in notified {
            hits.remove(&ip);
        }
        if is_once {
            hits.clear();
        }
    }

    /// Drop every sequence whose most recent record came from `log_name`.
    ///
    /// Used when a tail follower ends and restarts, so stale counts from
    /// before the gap cannot trigger alerts afterwards.
    pub fn discard_log(&self, log_name: &str) {
        self.hits.lock().retain(|_, records| {
            records
                .last()
                .map(|r| r.source_log.name != log_name)
                .unwrap_or(false)
        });
    }

    /// Number of IPs currently tracked.
    pub fn len(&self) -> usize {
        self.hits.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.lock().is_empty()
    }

    /// Current hit count for one IP.
    pub fn count(&self, ip: u32) -> u32 {
        self.hits
            .lock()
            .get(&ip)
            .and_then(|records| records.last())
            .map(|r| r.count)
            .unwrap_or(0)
    }
}
