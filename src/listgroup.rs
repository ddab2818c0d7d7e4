//! Keyed collection of [`NetList`]s with atomic per-member hot-swap.
//!
//! One `ListGroup` holds every feed of a kind (the safe group or the risk
//! group). Loaders replace individual members as feeds refresh; ingestors
//! query membership on every log line. Members are published behind an
//! `Arc`, so a query never observes a partially-built list and the write
//! lock is only ever held for the map operation itself, never for a trie
//! walk.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::netlist::{ListInfo, NetList};

struct Member {
    info: ListInfo,
    netlist: NetList,
}

/// Collection of named [`NetList`]s, unique by name.
#[derive(Default)]
pub struct ListGroup {
    members: RwLock<HashMap<String, Arc<Member>>>,
}

impl ListGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a freshly-built [`NetList`] under `info.name`, replacing any
    /// previous member with that name.
    pub fn add(&self, info: ListInfo, ips: impl IntoIterator<Item = u32>, cidrs: &[(u32, u8)]) {
        let netlist = NetList::new(ips, cidrs);
        let member = Arc::new(Member {
            info: info.clone(),
            netlist,
        });
        self.members.write().insert(info.name, member);
    }

    /// Remove the member named `name`, if present.
    pub fn delete(&self, name: &str) {
        self.members.write().remove(name);
    }

    /// Return the identity of some member list containing `ip`, or `None`.
    ///
    /// When several members match, which one is reported is unspecified.
    pub fn contains(&self, ip: u32) -> Option<ListInfo> {
        let members: Vec<Arc<Member>> = self.members.read().values().cloned().collect();
        members
            .iter()
            .find(|m| m.netlist.contains(ip))
            .map(|m| m.info.clone())
    }

    /// Number of member lists.
    pub fn len(&self) -> usize {
        self.members.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.read().is_empty()
    }

    /// Total entries across all members (exact addresses + prefixes).
    pub fn total_len(&self) -> usize {
        self.members.read().values().map(|m| m.netlist.len()).sum()
    }

    /// Entry count per member, keyed by list name.
    pub fn member_counts(&self) -> HashMap<String, usize> {
        self.members
            .read()
            .values()
            .map(|m| (m.info.name.clone(), m.netlist.len()))
            .collect()
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
    fn test_add_and_contains() {
        let group = ListGroup::new();
        group.add(ListInfo::new("feed-a", 1), [ip("10.1.2.3")], &[]);
        group.add(ListInfo::new("feed-b", 3), [], &[(ip("172.16.0.0"), 12)]);

        assert_eq!(
            group.contains(ip("10.1.2.3")),
            Some(ListInfo::new("feed-a", 1))
        );
        assert_eq!(
            group.contains(ip("172.20.0.1")),
            Some(ListInfo::new("feed-b", 3))
        );
        assert_eq!(group.contains(ip("8.8.8.8")), None);
    }

    #[test]
    fn test_add_replaces_by_name() {
        let group = ListGroup::new();
        group.add(ListInfo::new("feed", 1), [ip("1.1.1.1")], &[]);
        group.add(ListInfo::new("feed", 2), [ip("2.2.2.2")], &[]);

        assert_eq!(group.len(), 1);
        assert_eq!(group.contains(ip("1.1.1.1")), None);
        assert_eq!(group.contains(ip("2.2.2.2")), Some(ListInfo::new("feed", 2)));
    }

    #[test]
    fn test_delete() {
        let group = ListGroup::new();
        group.add(ListInfo::new("feed", 1), [ip("1.1.1.1")], &[]);
        group.delete("feed");
        assert!(group.is_empty());
        assert_eq!(group.contains(ip("1.1.1.1")), None);

        // deleting a missing name is a no-op
        group.delete("feed");
    }

    #[test]
    fn test_overlapping_members_report_one_of() {
        let group = ListGroup::new();
        group.add(ListInfo::new("broad", 1), [], &[(ip("10.0.0.0"), 8)]);
        group.add(ListInfo::new("narrow", 5), [ip("10.1.2.3")], &[]);

        let info = group.contains(ip("10.1.2.3")).unwrap();
        assert!(info.name == "broad" || info.name == "narrow");
    }

    #[test]
    fn test_counts() {
        let group = ListGroup::new();
        group.add(
            ListInfo::new("a", 1),
            [ip("1.1.1.1"), ip("2.2.2.2")],
            &[(ip("10.0.0.0"), 8)],
        );
        group.add(ListInfo::new("b", 2), [ip("3.3.3.3")], &[]);

        assert_eq!(group.total_len(), 4);
        let counts = group.member_counts();
        assert_eq!(counts.get("a"), Some(&3));
        assert_eq!(counts.get("b"), Some(&1));
    }

    #[test]
    fn test_concurrent_readers_and_writer() {
        use std::thread;

        let group = Arc::new(ListGroup::new());
        group.add(ListInfo::new("feed", 1), [ip("10.1.2.3")], &[]);

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let group = Arc::clone(&group);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        // Either the old or new member answers; never a torn state.
                        let _ = group.contains(ip("10.1.2.3"));
                    }
                })
            })
            .collect();

        for i in 0..50 {
            group.add(ListInfo::new("feed", i), [ip("10.1.2.3")], &[]);
        }

        for r in readers {
            r.join().unwrap();
        }
        assert!(group.contains(ip("10.1.2.3")).is_some());
    }
}
