//! Topology reconstruction
//!
//! The bus-access layer hands us a flat, unordered list of functions. Each one
//! only knows its own address and, for PCI-to-PCI bridges, the secondary bus
//! it forwards to. [`BusMap`] groups the functions by `(segment, bus)`,
//! records which bridge feeds each bus, and assigns a segment to root buses
//! that have no bridge above them.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::{debug, trace};

use crate::address::Sbdf;
use crate::constants::config_space::{
    HEADER_TYPE_BRIDGE, HEADER_TYPE_CARDBUS, HEADER_TYPE_MASK, HEADER_TYPE_NORMAL,
};
use crate::node::FingerprintNode;

// ============================================================================
// Raw Device Facts
// ============================================================================

/// Configuration header layout of a function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HeaderType {
    Normal,
    /// PCI-to-PCI bridge forwarding to `secondary`
    Bridge { secondary: u8 },
    CardBus,
    Unknown(u8),
}

impl HeaderType {
    /// Decode the header type register; `secondary` is only meaningful for bridges
    pub fn from_register(header: u8, secondary: u8) -> Self {
        match header & HEADER_TYPE_MASK {
            HEADER_TYPE_NORMAL => Self::Normal,
            HEADER_TYPE_BRIDGE => Self::Bridge { secondary },
            HEADER_TYPE_CARDBUS => Self::CardBus,
            other => Self::Unknown(other),
        }
    }
}

/// Per-function facts as reported by a [`BusAccess`](crate::BusAccess) backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawDevice {
    pub address: Sbdf,
    pub header: HeaderType,
    pub class: u16,
    pub interface: u8,
    pub vendor: u16,
    pub device: u16,
    /// Subsystem vendor and device; only normal headers define them
    pub subsystem: Option<(u16, u16)>,
}

// ============================================================================
// Topology Issues
// ============================================================================

/// Non-fatal inconsistency found while linking a scanned set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyIssue {
    /// The bridge feeding this node's bus is not in the set
    UnresolvedParent { slot: Sbdf, parent: Sbdf },
    /// The node's bus is fed by the node itself
    SelfParent { slot: Sbdf },
    /// Following parents from this node leads back to it
    Cycle { slot: Sbdf },
}

impl fmt::Display for TopologyIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedParent { slot, parent } => {
                write!(f, "{slot}: parent bridge {parent} not found")
            }
            Self::SelfParent { slot } => write!(f, "{slot}: bridge forwards to its own bus"),
            Self::Cycle { slot } => write!(f, "{slot}: parent chain loops back"),
        }
    }
}

// ============================================================================
// Bus Map
// ============================================================================

/// Everything known about one bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bus {
    /// Resolved segment; starts as the segment reported by the bus backend
    pub segment: u32,
    pub number: u8,
    /// Bridge whose secondary bus is this one
    pub root: Option<Sbdf>,
    /// Functions on this bus in arrival order
    pub devices: Vec<RawDevice>,
}

impl Bus {
    fn empty(segment: u32, number: u8) -> Self {
        Self {
            segment,
            number,
            root: None,
            devices: Vec::new(),
        }
    }
}

/// Functions grouped by `(segment, bus)`
#[derive(Debug, Clone, Default)]
pub struct BusMap {
    buses: BTreeMap<(u32, u8), Bus>,
}

impl BusMap {
    /// Bucket devices by bus and record the root bridge of every secondary bus
    pub fn new(devices: impl IntoIterator<Item = RawDevice>) -> Self {
        let mut buses: BTreeMap<(u32, u8), Bus> = BTreeMap::new();

        for dev in devices {
            let addr = dev.address;

            if let HeaderType::Bridge { secondary } = dev.header {
                trace!(bridge = %addr, secondary, "bridge found");
                buses
                    .entry((addr.segment, secondary))
                    .or_insert_with(|| Bus::empty(addr.segment, secondary))
                    .root = Some(addr);
            }

            buses
                .entry((addr.segment, addr.bus))
                .or_insert_with(|| Bus::empty(addr.segment, addr.bus))
                .devices
                .push(dev);
        }

        Self { buses }
    }

    /// Assign synthetic segments to bridgeless non-zero buses on segment 0
    ///
    /// Idempotent: a synthesized segment is never zero, so a second pass
    /// leaves every bus untouched.
    pub fn resolve_segments(&mut self) {
        for bus in self.buses.values_mut() {
            if bus.root.is_some() || bus.segment != 0 || bus.number == 0 {
                continue;
            }
            bus.segment = u32::from(synthesize_segment(bus.number));
            debug!(
                bus = format!("{:02x}", bus.number),
                segment = format!("{:x}", bus.segment),
                "synthesized segment for bridgeless bus"
            );
        }
    }

    pub fn get(&self, segment: u32, bus: u8) -> Option<&Bus> {
        self.buses.get(&(segment, bus))
    }

    /// Buses in `(segment, bus)` order
    pub fn buses(&self) -> impl Iterator<Item = &Bus> {
        self.buses.values()
    }

    pub fn len(&self) -> usize {
        self.buses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buses.is_empty()
    }

    /// One node per device, in bus order. Nodes are not linked yet.
    pub fn into_nodes(self) -> Vec<FingerprintNode> {
        let mut nodes = Vec::new();

        for bus in self.buses.into_values() {
            for dev in bus.devices {
                let (svendor, sdevice) = match dev.subsystem {
                    Some((sv, sd)) => (Some(sv), Some(sd)),
                    None => (None, None),
                };

                nodes.push(FingerprintNode {
                    parent: bus.root,
                    slot: Some(dev.address),
                    segment: bus.segment,
                    class: Some(dev.class),
                    interface: Some(dev.interface),
                    vendor: Some(dev.vendor),
                    device: Some(dev.device),
                    svendor,
                    sdevice,
                    ..FingerprintNode::default()
                });
            }
        }

        nodes
    }
}

/// Segment implied by the number of a bridgeless root bus
///
/// Some hosts put several virtual host bridges on segment 0 and encode the
/// real segment in the bus number. With `s` the bus rounded up to even, the
/// result keeps the bus parity in bit 0 and holds bits 1..7 of `s` reversed
/// in bits 1..7 (`R.bit[k] = s.bit[8 - k]`).
pub fn synthesize_segment(bus: u8) -> u8 {
    let parity = bus & 1;
    let even = bus.wrapping_add(parity);

    // reverse_bits maps s.bit[i] to bit 7 - i; the shift moves it to 8 - i
    // and drops s.bit[0], which is always clear.
    (even.reverse_bits() << 1) | parity
}
