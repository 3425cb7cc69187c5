//! Fingerprint set operations
//!
//! A [`FingerprintSet`] owns its nodes in one insertion-ordered vector; the
//! `up` links are indices into that vector. Everything that reorders the
//! vector keeps the links pointing at the same nodes.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::address::Sbdf;
use crate::node::{FingerprintNode, NodeId};
use crate::path;
use crate::topology::TopologyIssue;

// ============================================================================
// Fingerprint Set
// ============================================================================

/// Ordered collection of fingerprint nodes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FingerprintSet {
    nodes: Vec<FingerprintNode>,
}

impl FingerprintSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap unlinked nodes; `up` handles are cleared
    pub fn from_nodes(nodes: Vec<FingerprintNode>) -> Self {
        let mut set = Self { nodes };
        for node in &mut set.nodes {
            node.up = None;
            node.buggy = false;
        }
        set
    }

    pub fn push(&mut self, mut node: FingerprintNode) -> NodeId {
        node.up = None;
        node.buggy = false;
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Number of nodes
    pub fn count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[FingerprintNode] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut FingerprintNode> {
        self.nodes.iter_mut()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FingerprintNode> {
        self.nodes.iter()
    }

    pub fn get(&self, id: NodeId) -> Option<&FingerprintNode> {
        self.nodes.get(id.0)
    }

    /// Resolved parent node of `node`
    pub fn parent_of(&self, node: &FingerprintNode) -> Option<&FingerprintNode> {
        node.up.and_then(|id| self.get(id))
    }

    /// Resolve every node's `up` link from its `parent` address
    ///
    /// The first node whose slot equals the parent address wins. Misses and
    /// self-references are reported and leave the node in the set.
    pub fn link(&mut self) -> Vec<TopologyIssue> {
        let mut index: HashMap<Sbdf, usize> = HashMap::with_capacity(self.nodes.len());
        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(slot) = node.slot {
                index.entry(slot).or_insert(i);
            }
        }

        let mut issues = Vec::new();
        for (i, node) in self.nodes.iter_mut().enumerate() {
            node.up = None;
            node.buggy = false;

            let (Some(parent), Some(slot)) = (node.parent, node.slot) else {
                continue;
            };

            match index.get(&parent) {
                Some(&j) if j == i => {
                    warn!(%slot, "node is its own parent bridge");
                    node.buggy = true;
                    issues.push(TopologyIssue::SelfParent { slot });
                }
                Some(&j) => node.up = Some(NodeId(j)),
                None => {
                    warn!(%slot, %parent, "parent bridge not present in scan");
                    issues.push(TopologyIssue::UnresolvedParent { slot, parent });
                }
            }
        }

        issues
    }

    /// Compute paths for every addressed node; call after [`link`](Self::link)
    pub fn encode_paths(&mut self) -> Vec<TopologyIssue> {
        let (paths, issues) = path::encode(&self.nodes);
        for (node, path) in self.nodes.iter_mut().zip(paths) {
            if path.is_some() {
                node.path = path;
            }
        }
        issues
    }

    /// Stable canonical sort; links follow their nodes
    pub fn sort(&mut self) {
        let mut order: Vec<usize> = (0..self.nodes.len()).collect();
        merge_sort(&mut order, |&a, &b| canonical_cmp(&self.nodes[a], &self.nodes[b]));

        let mut new_index = vec![0; order.len()];
        for (new, &old) in order.iter().enumerate() {
            new_index[old] = new;
        }

        let mut old_nodes: Vec<Option<FingerprintNode>> =
            std::mem::take(&mut self.nodes).into_iter().map(Some).collect();
        self.nodes = order
            .iter()
            .filter_map(|&old| old_nodes[old].take())
            .map(|mut node| {
                node.up = node.up.map(|up| NodeId(new_index[up.0]));
                node
            })
            .collect();
    }

    /// First node, in current order, whose slot equals `slot`
    pub fn search(&self, slot: &Sbdf) -> Option<&FingerprintNode> {
        self.nodes.iter().find(|node| node.slot.as_ref() == Some(slot))
    }

    /// Score `pattern` against this set as the reference
    pub fn match_pattern(&self, pattern: &FingerprintSet) -> MatchReport {
        match_sets(self, pattern)
    }
}

impl<'a> IntoIterator for &'a FingerprintSet {
    type Item = &'a FingerprintNode;
    type IntoIter = std::slice::Iter<'a, FingerprintNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

impl FromIterator<FingerprintNode> for FingerprintSet {
    fn from_iter<I: IntoIterator<Item = FingerprintNode>>(iter: I) -> Self {
        Self::from_nodes(iter.into_iter().collect())
    }
}

/// Path order when both nodes have a path, slot order otherwise
///
/// Nodes without a slot sort after every addressed node. On a set mixing
/// nodes with and without paths this is not a total order, so it must only
/// be used through [`FingerprintSet::sort`].
pub fn canonical_cmp(a: &FingerprintNode, b: &FingerprintNode) -> Ordering {
    match (&a.path, &b.path) {
        (Some(p), Some(q)) => p.as_bytes().cmp(q.as_bytes()),
        _ => match (a.slot, b.slot) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    }
}

/// Bottom-up stable merge sort
///
/// Unlike `slice::sort_by` it accepts a comparator that is not a total
/// order: every step only asks whether the right element is strictly less
/// than the left one, so the result is always a permutation.
fn merge_sort<T: Copy>(items: &mut Vec<T>, mut cmp: impl FnMut(&T, &T) -> Ordering) {
    let len = items.len();
    let mut buf = Vec::with_capacity(len);
    let mut width = 1;

    while width < len {
        buf.clear();
        let mut start = 0;
        while start < len {
            let mid = (start + width).min(len);
            let end = (start + 2 * width).min(len);
            let (mut i, mut j) = (start, mid);
            while i < mid && j < end {
                if cmp(&items[j], &items[i]) == Ordering::Less {
                    buf.push(items[j]);
                    j += 1;
                } else {
                    buf.push(items[i]);
                    i += 1;
                }
            }
            buf.extend_from_slice(&items[i..mid]);
            buf.extend_from_slice(&items[j..end]);
            start = end;
        }
        std::mem::swap(items, &mut buf);
        width *= 2;
    }
}

// ============================================================================
// Matching
// ============================================================================

/// How a match report is judged complete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    /// Matching pairs must equal the pattern size
    #[default]
    Exact,
    /// Every pattern stanza must match at least one reference node
    AtLeast,
}

/// Outcome of scoring a pattern set against a reference set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchReport {
    /// Matching `(reference, pattern)` pairs, multiplicities counted
    pub rank: usize,
    /// Number of pattern stanzas
    pub size: usize,
    /// Pattern stanzas that matched at least one reference node
    pub satisfied: usize,
}

impl MatchReport {
    pub fn is_complete(&self, mode: MatchMode) -> bool {
        match mode {
            MatchMode::Exact => self.rank == self.size,
            MatchMode::AtLeast => self.satisfied == self.size,
        }
    }
}

/// Count matching `(r, p)` pairs over `reference × pattern`
pub fn match_sets(reference: &FingerprintSet, pattern: &FingerprintSet) -> MatchReport {
    let mut report = MatchReport {
        size: pattern.count(),
        ..MatchReport::default()
    };

    for p in pattern {
        let hits = reference.iter().filter(|r| node_matches(r, p)).count();
        report.rank += hits;
        if hits > 0 {
            report.satisfied += 1;
        }
    }

    debug!(
        rank = report.rank,
        size = report.size,
        satisfied = report.satisfied,
        "pattern scored"
    );
    report
}

/// True when every constrained field of `pattern` equals the field of `node`
pub fn node_matches(node: &FingerprintNode, pattern: &FingerprintNode) -> bool {
    address_matches(node, pattern)
        && field_matches(node.class, pattern.class)
        && field_matches(node.interface, pattern.interface)
        && field_matches(node.vendor, pattern.vendor)
        && field_matches(node.device, pattern.device)
        && field_matches(node.svendor, pattern.svendor)
        && field_matches(node.sdevice, pattern.sdevice)
}

/// Paths decide when both sides have one; raw addresses otherwise
fn address_matches(node: &FingerprintNode, pattern: &FingerprintNode) -> bool {
    if let (Some(path), Some(wanted)) = (&node.path, &pattern.path) {
        return path == wanted;
    }
    field_matches(node.parent, pattern.parent) && field_matches(node.slot, pattern.slot)
}

fn field_matches<T: PartialEq>(value: Option<T>, pattern: Option<T>) -> bool {
    match pattern {
        None => true,
        Some(wanted) => value == Some(wanted),
    }
}
