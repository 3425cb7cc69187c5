//! Path encoder
//!
//! A node's path is its root prefix followed by one `/<device>.<function>`
//! component per level, all in lowercase hex:
//!
//! ```text
//! 0/1c.0/0.0      NIC behind root port 00:1c.0 on segment 0
//! c1/0.0          function on bridgeless bus 5 (synthesized segment 0xc1)
//! B/0.0           child of a node that is its own ancestor
//! ```
//!
//! Paths are built iteratively with one memo slot per node, so deep chains
//! cost linear work and malformed cyclic input cannot recurse forever.

use tracing::warn;

use crate::constants::stanza::BUGGY_PATH;
use crate::node::FingerprintNode;
use crate::topology::TopologyIssue;

/// Compute the path of every addressed node in a linked slice
///
/// Returns one entry per node (`None` for nodes without a slot) and the
/// cycles found on the way. Nodes whose parent chain loops are cut at the
/// node where the loop closes, which gets the `B` marker.
pub(crate) fn encode(nodes: &[FingerprintNode]) -> (Vec<Option<String>>, Vec<TopologyIssue>) {
    let mut memo: Vec<Option<String>> = vec![None; nodes.len()];
    let mut on_chain = vec![false; nodes.len()];
    let mut issues = Vec::new();
    let mut chain = Vec::new();

    for start in 0..nodes.len() {
        if memo[start].is_some() || nodes[start].slot.is_none() {
            continue;
        }

        // Walk up until a known prefix, a root, or a loop
        chain.clear();
        let mut cur = start;
        loop {
            if memo[cur].is_some() {
                break;
            }
            if nodes[cur].buggy {
                memo[cur] = Some(BUGGY_PATH.to_string());
                break;
            }
            if on_chain[cur] {
                if let Some(slot) = nodes[cur].slot {
                    warn!(%slot, "parent chain loops back; marking node as buggy");
                    issues.push(TopologyIssue::Cycle { slot });
                }
                memo[cur] = Some(BUGGY_PATH.to_string());
                break;
            }
            on_chain[cur] = true;
            chain.push(cur);
            match nodes[cur].up {
                Some(up) => cur = up.index(),
                None => break,
            }
        }

        // Fill in root-to-leaf
        for &idx in chain.iter().rev() {
            on_chain[idx] = false;
            if memo[idx].is_some() {
                continue;
            }
            let node = &nodes[idx];
            let Some(slot) = node.slot else { continue };

            let mut path = match node.up {
                Some(up) => memo[up.index()].clone().unwrap_or_else(|| BUGGY_PATH.to_string()),
                None => format!("{:x}", node.segment),
            };
            path.push_str(&format!("/{:x}.{:x}", slot.device, slot.function));
            memo[idx] = Some(path);
        }
    }

    (memo, issues)
}
