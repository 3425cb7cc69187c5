//! Collaborator interfaces
//!
//! The engine never touches hardware directly. A [`BusAccess`] yields the raw
//! function list of a host, a [`NameSource`] attaches human-readable labels.
//! Linux implementations backed by sysfs live in the submodules.

pub mod names;
pub mod sysfs;

use pfp_error::Result;

use crate::address::Sbdf;
use crate::topology::RawDevice;

pub use names::SysfsNames;
pub use sysfs::SysfsBus;

/// Enumerates the PCI functions of a host
#[cfg_attr(test, mockall::automock)]
pub trait BusAccess {
    /// Every function currently present, in any order
    fn devices(&self) -> Result<Vec<RawDevice>>;
}

/// Supplies human-readable names for a function
#[cfg_attr(test, mockall::automock)]
pub trait NameSource {
    /// Zero or more labels for `slot`; an error leaves the node unnamed
    fn names(&self, slot: &Sbdf) -> Result<Vec<String>>;
}
