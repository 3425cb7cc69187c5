//! pfp Core Library
//!
//! PCI topology fingerprinting: describe the devices of a machine by where
//! they sit in the bus hierarchy, and decide whether a machine matches a
//! pattern of partially specified devices.
//!
//! # Features
//!
//! - **Scanning**: Enumerate PCI functions and link every device to the bridge above it
//! - **Path Encoding**: Stable `segment/dev.fn/dev.fn` paths independent of bus numbering
//! - **Stanza Format**: Human-editable text fingerprints with wildcard fields
//! - **Matching**: Score a pattern against a reference, singly or over a directory
//!
//! # Module Structure
//!
//! - `access/` - Bus and name backends (sysfs)
//! - `topology`, `scan` - Bus map, segment synthesis and the scan pipeline
//! - `set`, `codec` - Fingerprint sets, matching and the text format
//!
//! # Example
//!
//! ```no_run
//! use pfp_core::{codec, scan, ShowOptions, SysfsBus};
//!
//! let mut host = scan(&SysfsBus::default()).unwrap().set;
//! host.sort();
//! let pattern = codec::parse_str("vendor\t= 8086\n").unwrap();
//! let report = host.match_pattern(&pattern);
//! println!("rank {} of {}", report.rank, report.size);
//! println!("{}", codec::to_text(&host, &ShowOptions::default()));
//! ```

pub mod access;
pub mod address;
pub mod codec;
pub mod constants;
pub mod convert;
pub mod identify;
pub mod node;
mod path;
pub mod scan;
pub mod set;
pub mod topology;

// Re-export error types
pub use pfp_error::{PfpError, Result};

pub use access::{BusAccess, NameSource, SysfsBus, SysfsNames};
pub use address::Sbdf;
pub use codec::{parse, parse_file, show, to_text, ShowOptions};
pub use convert::convert_lspci;
pub use identify::{identify, Identification};
pub use node::{FingerprintNode, NodeId};
pub use scan::{fill_names, scan, Scan};
pub use set::{match_sets, FingerprintSet, MatchMode, MatchReport};
pub use topology::{synthesize_segment, BusMap, HeaderType, RawDevice, TopologyIssue};

/// Serialize a set as pretty JSON, one object per node
pub fn to_json(set: &FingerprintSet) -> Result<String> {
    Ok(serde_json::to_string_pretty(set.nodes())?)
}
