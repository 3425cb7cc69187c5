//! Centralized constants for pfp
//!
//! Filesystem locations and PCI configuration space layout used by the sysfs
//! backends.

// ============================================================================
// Paths
// ============================================================================

pub mod paths {
    /// Default sysfs mount point
    pub const SYSFS_ROOT: &str = "/sys";

    /// PCI device directory relative to the sysfs root
    pub const PCI_DEVICES: &str = "bus/pci/devices";

    /// Device class directory relative to the sysfs root
    pub const CLASS: &str = "class";

    /// Configuration space attribute inside a PCI device directory
    pub const CONFIG_ATTR: &str = "config";
}

// ============================================================================
// PCI Configuration Space
// ============================================================================

pub mod config_space {
    pub const VENDOR_ID: usize = 0x00;
    pub const DEVICE_ID: usize = 0x02;
    pub const PROG_IF: usize = 0x09;
    /// Class code word: subclass at 0x0a, base class at 0x0b
    pub const CLASS_DEVICE: usize = 0x0a;
    pub const HEADER_TYPE: usize = 0x0e;
    /// Secondary bus number register of a PCI-to-PCI bridge (header type 1)
    pub const SECONDARY_BUS: usize = 0x19;
    /// Subsystem vendor ID of a normal device (header type 0)
    pub const SUBSYSTEM_VENDOR_ID: usize = 0x2c;
    pub const SUBSYSTEM_ID: usize = 0x2e;

    /// Bytes of the standard header readable without privileges
    pub const HEADER_SIZE: usize = 0x40;

    /// Header type without the multi-function bit
    pub const HEADER_TYPE_MASK: u8 = 0x7f;
    pub const HEADER_TYPE_NORMAL: u8 = 0x00;
    pub const HEADER_TYPE_BRIDGE: u8 = 0x01;
    pub const HEADER_TYPE_CARDBUS: u8 = 0x02;
}

// ============================================================================
// Stanza Format
// ============================================================================

pub mod stanza {
    /// Path marker for a node that is its own ancestor
    pub const BUGGY_PATH: &str = "B";

    /// Subsystem vendor value meaning "not programmed"
    pub const ID_ALL_ONES: u16 = 0xffff;

    /// Separator between multiple enrichment names
    pub const NAME_SEPARATOR: &str = ", ";
}
