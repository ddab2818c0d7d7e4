//! Single-source membership structure over exact IPs and CIDR prefixes.
//!
//! A [`NetList`] is built once from the parsed content of one feed and is
//! immutable afterwards; refreshes publish a whole new `NetList` through
//! [`crate::listgroup::ListGroup`]. Exact addresses live in a hash set,
//! prefixes in a binary trie walked most-significant-bit first. Trie nodes
//! are stored in a single arena and reference children by index (0 = no
//! child), so a published list is a plain contiguous allocation that any
//! number of reader threads can share.

use std::collections::HashSet;

use serde::Serialize;

/// Identity of a list within a group: feed name plus its risk-or-log weight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ListInfo {
    pub name: String,
    pub level: i32,
}

impl ListInfo {
    pub fn new(name: impl Into<String>, level: i32) -> Self {
        Self {
            name: name.into(),
            level,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct TrieNode {
    /// Child indices for bit 0 / bit 1; 0 means no child (the root is
    /// never a child, so index 0 is free to mean "none").
    children: [u32; 2],
    /// Marks the end of a contained prefix.
    terminal: bool,
}

/// Membership matcher for one data source.
#[derive(Debug, Default)]
pub struct NetList {
    exact: HashSet<u32>,
    nodes: Vec<TrieNode>,
    prefix_count: usize,
}

impl NetList {
    /// Build a matcher from bare addresses and `(network, prefix_len)` pairs.
    ///
    /// Prefix lengths above 32 are clamped to 32; host bits below the
    /// prefix are ignored, so callers need not mask networks beforehand.
    pub fn new(ips: impl IntoIterator<Item = u32>, cidrs: &[(u32, u8)]) -> Self {
        let mut list = Self {
            exact: ips.into_iter().collect(),
            nodes: vec![TrieNode::default()],
            prefix_count: 0,
        };
        for &(network, prefix_len) in cidrs {
            list.add_prefix(network, prefix_len.min(32));
        }
        list
    }

    fn add_prefix(&mut self, network: u32, prefix_len: u8) {
        let mut node = 0usize;
        for i in (32 - prefix_len as u32..32).rev() {
            let bit = ((network >> i) & 1) as usize;
            let child = self.nodes[node].children[bit];
            node = if child == 0 {
                self.nodes.push(TrieNode::default());
                let idx = (self.nodes.len() - 1) as u32;
                self.nodes[node].children[bit] = idx;
                idx as usize
            } else {
                child as usize
            };
        }
        if !self.nodes[node].terminal {
            self.nodes[node].terminal = true;
            self.prefix_count += 1;
        }
    }

    /// True when `ip` is an exact member or covered by any contained prefix.
    ///
    /// The walk stops at the first terminal node on the path, so the
    /// shortest containing prefix answers without visiting deeper nodes.
    pub fn contains(&self, ip: u32) -> bool {
        if self.exact.contains(&ip) {
            return true;
        }
        let mut node = 0usize;
        for i in (0..32).rev() {
            if self.nodes[node].terminal {
                return true;
            }
            let bit = ((ip >> i) & 1) as usize;
            let child = self.nodes[node].children[bit];
            if child == 0 {
                return false;
            }
            node = child as usize;
        }
        self.nodes[node].terminal
    }

    /// Number of entries: exact addresses plus distinct prefixes.
    pub fn len(&self) -> usize {
        self.exact.len() + self.prefix_count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn top_bits(ip: u32, len: u8) -> u32 {
        if len == 0 {
            0
        } else {
            ip >> (32 - len as u32)
        }
    }

    proptest! {
        /// contains(x) holds iff x is in the exact set or some prefix covers it.
        #[test]
        fn prop_membership_matches_definition(
            ips in prop::collection::hash_set(any::<u32>(), 0..40),
            cidrs in prop::collection::vec((any::<u32>(), 0u8..=32), 0..20),
            probes in prop::collection::vec(any::<u32>(), 0..60),
        ) {
            let list = NetList::new(ips.iter().copied(), &cidrs);
            for probe in probes {
                let expected = ips.contains(&probe)
                    || cidrs.iter().any(|&(n, l)| top_bits(probe, l) == top_bits(n, l));
                prop_assert_eq!(list.contains(probe), expected, "probe {}", probe);
            }
        }

        /// Every listed exact address and every prefix network is a member.
        #[test]
        fn prop_inputs_are_members(
            ips in prop::collection::vec(any::<u32>(), 0..40),
            cidrs in prop::collection::vec((any::<u32>(), 0u8..=32), 0..20),
        ) {
            let list = NetList::new(ips.iter().copied(), &cidrs);
            for ip in &ips {
                prop_assert!(list.contains(*ip));
            }
            for &(network, _) in &cidrs {
                prop_assert!(list.contains(network));
            }
        }
    }
}
