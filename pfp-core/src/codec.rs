//! Stanza text codec
//!
//! A fingerprint file holds one stanza per PCI function, stanzas separated by
//! blank lines:
//!
//! ```text
//! path	= 0/1c.0/0.0 (net enp2s0)
//! slot	= 2:0.0
//! class	= 0200.0
//! vendor	= 8086
//! device	= 10d3
//! svendor	= 1028
//! sdevice	= 0869
//! ```
//!
//! Every field is optional; a field left out of a pattern stanza matches
//! anything. Lines starting with `#` are comments.

use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use pfp_error::{PfpError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::address::{parse_device, parse_function, parse_hex, Sbdf};
use crate::constants::stanza::{BUGGY_PATH, ID_ALL_ONES};
use crate::node::FingerprintNode;
use crate::set::FingerprintSet;

/// Output detail, threaded explicitly into the writer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowOptions {
    /// 1: raw addresses next to paths; 2: subsystem IDs always
    pub verbosity: u8,
}

impl ShowOptions {
    pub fn new(verbosity: u8) -> Self {
        Self { verbosity }
    }
}

// ============================================================================
// Writer
// ============================================================================

/// Write every node of `set` as a stanza
pub fn show<W: Write>(set: &FingerprintSet, to: &mut W, opts: &ShowOptions) -> io::Result<()> {
    write!(to, "{}", Stanzas { set, opts: *opts })
}

/// Write one node as a stanza, without the separating blank line
///
/// A node's name is only written as the suffix of its `path` line, so an
/// unpathed node is written without its name.
pub fn write_stanza<W: Write>(node: &FingerprintNode, to: &mut W, opts: &ShowOptions) -> io::Result<()> {
    write!(to, "{}", StanzaView { node, opts: *opts })
}

/// Render a whole set to a string
pub fn to_text(set: &FingerprintSet, opts: &ShowOptions) -> String {
    Stanzas { set, opts: *opts }.to_string()
}

struct Stanzas<'a> {
    set: &'a FingerprintSet,
    opts: ShowOptions,
}

impl fmt::Display for Stanzas<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.set.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", StanzaView { node, opts: self.opts })?;
        }
        Ok(())
    }
}

struct StanzaView<'a> {
    node: &'a FingerprintNode,
    opts: ShowOptions,
}

impl fmt::Display for StanzaView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.node;

        if let Some(path) = &node.path {
            match &node.name {
                Some(name) => writeln!(f, "path\t= {path} ({name})")?,
                None => writeln!(f, "path\t= {path}")?,
            }
        }

        if let Some(parent) = node.parent {
            if node.path.is_none() || self.opts.verbosity > 0 {
                writeln!(f, "parent\t= {}", parent.compact())?;
            }
        }

        if let Some(slot) = node.slot {
            writeln!(f, "slot\t= {}", slot.compact())?;
        }

        match (node.class, node.interface) {
            (Some(class), Some(interface)) => writeln!(f, "class\t= {class:04x}.{interface:x}")?,
            (Some(class), None) => writeln!(f, "class\t= {class:04x}")?,
            _ => {}
        }

        write_id(f, "vendor", node.vendor)?;
        write_id(f, "device", node.device)?;

        if self.opts.verbosity > 1 || has_distinct_subsystem(node) {
            write_id(f, "svendor", node.svendor)?;
            write_id(f, "sdevice", node.sdevice)?;
        }

        Ok(())
    }
}

fn write_id(f: &mut fmt::Formatter<'_>, key: &str, id: Option<u16>) -> fmt::Result {
    match id {
        Some(id) => writeln!(f, "{key}\t= {id:04x}"),
        None => Ok(()),
    }
}

/// Subsystem vendor worth printing: programmed, and not the primary vendor
fn has_distinct_subsystem(node: &FingerprintNode) -> bool {
    match node.svendor {
        Some(sv) => sv != 0 && sv != ID_ALL_ONES && Some(sv) != node.vendor,
        None => node.sdevice.is_some(),
    }
}

// ============================================================================
// Parser
// ============================================================================

/// Parse stanzas from a reader
///
/// Any malformed line fails the whole parse; nothing is guessed.
pub fn parse<R: BufRead>(input: R) -> Result<FingerprintSet> {
    let mut set = FingerprintSet::new();
    let mut current: Option<Stanza> = None;

    for (idx, line) in input.lines().enumerate() {
        let line = line?;
        let lineno = idx + 1;
        let text = line.trim();

        if text.is_empty() {
            if let Some(stanza) = current.take() {
                set.push(stanza.node);
            }
            continue;
        }
        if text.starts_with('#') {
            continue;
        }

        let (key, value) = text
            .split_once('=')
            .ok_or_else(|| PfpError::malformed(lineno, "expected `key = value`"))?;
        current
            .get_or_insert_with(Stanza::default)
            .apply(key.trim(), value.trim(), lineno)?;
    }

    if let Some(stanza) = current.take() {
        set.push(stanza.node);
    }

    debug!(stanzas = set.count(), "parsed fingerprint");
    Ok(set)
}

/// Parse a fingerprint file
pub fn parse_file(path: &Path) -> Result<FingerprintSet> {
    let file = File::open(path).map_err(|e| PfpError::file_read(path, e))?;
    parse(BufReader::new(file))
}

/// Parse stanzas from a string
pub fn parse_str(text: &str) -> Result<FingerprintSet> {
    parse(text.as_bytes())
}

#[derive(Default)]
struct Stanza {
    node: FingerprintNode,
    seen: HashSet<&'static str>,
}

impl Stanza {
    fn apply(&mut self, key: &str, value: &str, line: usize) -> Result<()> {
        let key: &'static str = match key {
            "path" => "path",
            "parent" => "parent",
            "slot" => "slot",
            "class" => "class",
            "vendor" => "vendor",
            "device" => "device",
            "svendor" => "svendor",
            "sdevice" => "sdevice",
            other => return Err(PfpError::malformed(line, format!("unknown key `{other}`"))),
        };
        if !self.seen.insert(key) {
            return Err(PfpError::malformed(line, format!("duplicate key `{key}`")));
        }

        let node = &mut self.node;
        match key {
            "path" => {
                let (path, name) = parse_path_value(value, line)?;
                node.path = Some(path);
                node.name = name;
            }
            "parent" => node.parent = Some(parse_address(value, line)?),
            "slot" => {
                let slot = parse_address(value, line)?;
                node.slot = Some(slot);
                node.segment = slot.segment;
            }
            "class" => {
                let (class, interface) = match value.split_once('.') {
                    Some((class, interface)) => (class, Some(interface)),
                    None => (value, None),
                };
                node.class = Some(parse_id(class, key, line)?);
                node.interface = interface
                    .map(|i| {
                        parse_hex::<u8>(i).ok_or_else(|| {
                            PfpError::malformed(line, format!("bad programming interface `{i}`"))
                        })
                    })
                    .transpose()?;
            }
            "vendor" => node.vendor = Some(parse_id(value, key, line)?),
            "device" => node.device = Some(parse_id(value, key, line)?),
            "svendor" => node.svendor = Some(parse_id(value, key, line)?),
            _ => node.sdevice = Some(parse_id(value, key, line)?),
        }
        Ok(())
    }
}

fn parse_address(value: &str, line: usize) -> Result<Sbdf> {
    value
        .parse()
        .map_err(|_| PfpError::malformed(line, format!("bad address `{value}`")))
}

fn parse_id(value: &str, key: &str, line: usize) -> Result<u16> {
    if value.len() > 4 {
        return Err(PfpError::malformed(line, format!("{key} `{value}` is wider than 16 bits")));
    }
    parse_hex::<u16>(value).ok_or_else(|| PfpError::malformed(line, format!("bad {key} `{value}`")))
}

/// Split `0/1c.0/0.0 (net eth0)` into the path and the optional name
fn parse_path_value(value: &str, line: usize) -> Result<(String, Option<String>)> {
    let (path, name) = match value.split_once('(') {
        Some((path, rest)) => {
            let name = rest
                .strip_suffix(')')
                .ok_or_else(|| PfpError::malformed(line, "unterminated name in path"))?;
            (path.trim(), Some(name.trim().to_string()))
        }
        None => (value, None),
    };

    if !is_valid_path(path) {
        return Err(PfpError::malformed(line, format!("bad path `{path}`")));
    }
    Ok((path.to_string(), name.filter(|n| !n.is_empty())))
}

fn is_valid_path(path: &str) -> bool {
    let mut parts = path.split('/');
    let root_ok = match parts.next() {
        Some(root) => root == BUGGY_PATH || parse_hex::<u32>(root).is_some(),
        None => false,
    };
    root_ok
        && parts.all(|part| match part.split_once('.') {
            Some((dev, func)) => parse_device(dev).is_some() && parse_function(func).is_some(),
            None => false,
        })
}
