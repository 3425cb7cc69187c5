//! `lspci -nm` conversion
//!
//! Turns machine-readable lspci output into pattern stanzas:
//!
//! ```text
//! 00:1f.3 "0403" "8086" "a348" -r10 -p80 "1028" "0869"
//! ```
//!
//! becomes a stanza with `slot`, `class` (interface from `-p`, default 0),
//! `vendor`/`device` and `svendor`/`sdevice` when lspci reports them.

use std::io::BufRead;

use lazy_static::lazy_static;
use pfp_error::Result;
use regex::Regex;
use tracing::debug;

use crate::address::{parse_hex, Sbdf};
use crate::node::FingerprintNode;
use crate::set::FingerprintSet;

lazy_static! {
    static ref LSPCI_LINE: Option<Regex> = Regex::new(
        r#"^(\S+) "([0-9a-fA-F]{4})" "([0-9a-fA-F]{0,4})" "([0-9a-fA-F]{0,4})"(?: -r([0-9a-fA-F]{2}))?(?: -p([0-9a-fA-F]{2}))? "([0-9a-fA-F]{0,4})" "([0-9a-fA-F]{0,4})""#
    )
    .ok();
}

/// Convert every recognised lspci line; other lines are skipped
pub fn convert_lspci<R: BufRead>(input: R) -> Result<FingerprintSet> {
    let mut set = FingerprintSet::new();
    for line in input.lines() {
        let line = line?;
        match convert_line(&line) {
            Some(node) => {
                set.push(node);
            }
            None => debug!(line = %line, "not an lspci -nm line"),
        }
    }
    Ok(set)
}

/// One lspci line as a pattern node
pub fn convert_line(line: &str) -> Option<FingerprintNode> {
    let caps = LSPCI_LINE.as_ref()?.captures(line.trim())?;
    let hex16 = |i: usize| caps.get(i).and_then(|m| parse_hex::<u16>(m.as_str()));

    let slot: Sbdf = caps[1].parse().ok()?;
    let interface = caps
        .get(6)
        .and_then(|m| parse_hex::<u8>(m.as_str()))
        .unwrap_or(0);

    let mut node = FingerprintNode::pattern()
        .with_slot(slot)
        .with_class(hex16(2)?, Some(interface));
    if let (Some(vendor), Some(device)) = (hex16(3), hex16(4)) {
        node = node.with_ids(vendor, device);
    }
    if let (Some(svendor), Some(sdevice)) = (hex16(7), hex16(8)) {
        node = node.with_subsystem(svendor, sdevice);
    }
    Some(node)
}
