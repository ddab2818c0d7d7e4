//! Process-wide engine state.
//!
//! The engine owns everything the subsystems share: the current config,
//! the safe and risk list groups, the hit accumulator, the pending
//! notification queue, and the sent counter. Components hold an
//! `Arc<Engine>`; a config reload tears the engine down and builds a
//! fresh one rather than mutating shared state in place.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::accumulator::HitAccumulator;
use crate::config::{Config, NotificationPolicy};
use crate::listgroup::ListGroup;
use crate::netlist::ListInfo;
use crate::queue::NotificationQueue;

/// Which of the two well-known list groups a feed belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Safe,
    Risk,
}

impl GroupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupKind::Safe => "safe_list",
            GroupKind::Risk => "risk_list",
        }
    }
}

pub struct Engine {
    config: RwLock<Config>,
    pub safe_list: ListGroup,
    pub risk_list: ListGroup,
    pub hits: HitAccumulator,
    pub queue: NotificationQueue,
    notifications_sent: AtomicU64,
}

impl Engine {
    pub fn new(config: Config) -> Arc<Self> {
        Arc::new(Self {
            config: RwLock::new(config),
            safe_list: ListGroup::new(),
            risk_list: ListGroup::new(),
            hits: HitAccumulator::new(),
            queue: NotificationQueue::new(),
            notifications_sent: AtomicU64::new(0),
        })
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> Config {
        self.config.read().clone()
    }

    pub fn policies(&self) -> Vec<NotificationPolicy> {
        self.config.read().notifications.services.clone()
    }

    pub fn max_retry(&self) -> u32 {
        self.config.read().notifications.max_retry()
    }

    pub fn group(&self, kind: GroupKind) -> &ListGroup {
        match kind {
            GroupKind::Safe => &self.safe_list,
            GroupKind::Risk => &self.risk_list,
        }
    }

    /// Decide whether `ip` warrants alerting.
    ///
    /// The safe group wins unconditionally; this is the only precedence
    /// rule in the matcher. Returns the matching risk list's identity for
    /// a sensitive IP, `None` otherwise.
    pub fn is_sensitive(&self, ip: u32) -> Option<ListInfo> {
        if self.safe_list.contains(ip).is_some() {
            return None;
        }
        self.risk_list.contains(ip)
    }

    /// Evaluate notification policies against the accumulated hits.
    pub fn drain_hits(&self, is_once: bool) {
        let policies = self.policies();
        self.hits.drain(&policies, &self.queue, is_once);
    }

    pub fn record_sent(&self) {
        self.notifications_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn notifications_sent(&self) -> u64 {
        self.notifications_sent.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ip::parse_ipv4;

    fn ip(s: &str) -> u32 {
        parse_ipv4(s).unwrap()
    }

    #[test]
    fn test_risk_match_is_sensitive() {
        let engine = Engine::new(Config::default());
        engine
            .risk_list
            .add(ListInfo::new("t1", 1), [], &[(ip("10.0.0.0"), 8)]);

        assert_eq!(
            engine.is_sensitive(ip("10.1.2.3")),
            Some(ListInfo::new("t1", 1))
        );
        assert_eq!(engine.is_sensitive(ip("11.0.0.1")), None);
    }

    #[test]
    fn test_safe_list_wins_over_risk_match() {
        let engine = Engine::new(Config::default());
        engine
            .safe_list
            .add(ListInfo::new("lan", 0), [], &[(ip("10.0.0.0"), 8)]);
        engine
            .risk_list
            .add(ListInfo::new("feed", 5), [ip("10.1.2.3")], &[]);

        assert_eq!(engine.is_sensitive(ip("10.1.2.3")), None);
        // the risk group itself still matches; only the oracle suppresses it
        assert!(engine.risk_list.contains(ip("10.1.2.3")).is_some());
    }

    #[test]
    fn test_empty_groups_are_not_sensitive() {
        let engine = Engine::new(Config::default());
        assert_eq!(engine.is_sensitive(ip("8.8.8.8")), None);
    }

    #[test]
    fn test_sent_counter() {
        let engine = Engine::new(Config::default());
        assert_eq!(engine.notifications_sent(), 0);
        engine.record_sent();
        engine.record_sent();
        assert_eq!(engine.notifications_sent(), 2);
    }

    #[test]
    fn test_group_accessor() {
        let engine = Engine::new(Config::default());
        engine.group(GroupKind::Risk).add(
            ListInfo::new("feed", 1),
            [ip("1.1.1.1")],
            &[],
        );
        assert_eq!(engine.risk_list.len(), 1);
        assert_eq!(engine.safe_list.len(), 0);
    }
}
