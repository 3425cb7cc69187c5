//! Fingerprint node model
//!
//! One [`FingerprintNode`] describes one PCI function. Nodes built from a scan
//! carry concrete values everywhere; nodes parsed from a pattern file leave
//! any field they do not constrain as `None`, which matches anything.

use serde::Serialize;

use crate::address::Sbdf;

/// Handle of a node inside its owning [`FingerprintSet`](crate::FingerprintSet)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Canonical record of one PCI function
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FingerprintNode {
    /// Bridge function whose secondary bus is this node's bus
    pub parent: Option<Sbdf>,
    /// This function's own address
    pub slot: Option<Sbdf>,
    /// Resolved segment; synthesized for bridgeless root buses
    pub segment: u32,
    /// Base class and subclass (`0x0200` for an Ethernet controller)
    pub class: Option<u16>,
    /// Programming interface byte
    pub interface: Option<u8>,
    pub vendor: Option<u16>,
    pub device: Option<u16>,
    pub svendor: Option<u16>,
    pub sdevice: Option<u16>,
    /// Human-readable label from the name source
    pub name: Option<String>,
    /// Canonical hierarchical path, valid once the whole set is linked
    pub path: Option<String>,

    #[serde(skip)]
    pub(crate) up: Option<NodeId>,
    #[serde(skip)]
    pub(crate) buggy: bool,
}

impl FingerprintNode {
    /// A node with every field wildcarded
    pub fn pattern() -> Self {
        Self::default()
    }

    /// Resolved parent node, if linkage found one
    pub fn up(&self) -> Option<NodeId> {
        self.up
    }

    /// True when the node resolved to itself as parent
    pub fn is_buggy(&self) -> bool {
        self.buggy
    }

    /// Builder-style setters, used by tests and by the lspci converter
    pub fn with_slot(mut self, slot: Sbdf) -> Self {
        self.slot = Some(slot);
        self.segment = slot.segment;
        self
    }

    pub fn with_parent(mut self, parent: Sbdf) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_class(mut self, class: u16, interface: Option<u8>) -> Self {
        self.class = Some(class);
        self.interface = interface;
        self
    }

    pub fn with_ids(mut self, vendor: u16, device: u16) -> Self {
        self.vendor = Some(vendor);
        self.device = Some(device);
        self
    }

    pub fn with_subsystem(mut self, svendor: u16, sdevice: u16) -> Self {
        self.svendor = Some(svendor);
        self.sdevice = Some(sdevice);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_is_all_wildcards() {
        let node = FingerprintNode::pattern();
        assert!(node.parent.is_none());
        assert!(node.slot.is_none());
        assert!(node.class.is_none());
        assert!(node.interface.is_none());
        assert!(node.vendor.is_none() && node.device.is_none());
        assert!(node.svendor.is_none() && node.sdevice.is_none());
        assert!(node.up().is_none());
        assert!(!node.is_buggy());
    }

    #[test]
    fn test_with_slot_sets_segment() {
        let node = FingerprintNode::pattern().with_slot(Sbdf::new(2, 1, 0, 0));
        assert_eq!(node.segment, 2);
        assert_eq!(node.slot, Some(Sbdf::new(2, 1, 0, 0)));
    }

    #[test]
    fn test_json_skips_links() {
        let node = FingerprintNode::pattern()
            .with_slot(Sbdf::new(0, 0, 0x1f, 0))
            .with_ids(0x8086, 0x2918)
            .with_path("0/1f.0");
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["vendor"], 0x8086);
        assert_eq!(json["path"], "0/1f.0");
        assert!(json.get("up").is_none());
        assert!(json.get("buggy").is_none());
    }
}
