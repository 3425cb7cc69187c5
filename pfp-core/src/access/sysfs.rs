//! sysfs PCI bus backend
//!
//! Reads `/sys/bus/pci/devices/<ssss:bb:dd.f>/config`. The first 64 bytes of
//! configuration space are readable without privileges and hold everything
//! the fingerprint needs.

use std::fs;
use std::path::{Path, PathBuf};

use pfp_error::{PfpError, Result};
use tracing::{debug, info, warn};

use super::BusAccess;
use crate::address::Sbdf;
use crate::constants::config_space::*;
use crate::constants::paths;
use crate::topology::{HeaderType, RawDevice};

/// [`BusAccess`] over a sysfs tree
#[derive(Debug, Clone)]
pub struct SysfsBus {
    root: PathBuf,
}

impl SysfsBus {
    /// Backend rooted at a sysfs mount point (normally `/sys`)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn devices_dir(&self) -> PathBuf {
        self.root.join(paths::PCI_DEVICES)
    }
}

impl Default for SysfsBus {
    fn default() -> Self {
        Self::new(paths::SYSFS_ROOT)
    }
}

impl BusAccess for SysfsBus {
    fn devices(&self) -> Result<Vec<RawDevice>> {
        let dir = self.devices_dir();
        let entries = fs::read_dir(&dir)
            .map_err(|e| PfpError::bus_access(format!("cannot list {}: {e}", dir.display())))?;

        let mut devices = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| PfpError::bus_access(format!("cannot list {}: {e}", dir.display())))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();

            let Ok(address) = name.parse::<Sbdf>() else {
                debug!(entry = %name, "skipping non-PCI entry");
                continue;
            };

            match read_device(&entry.path(), address) {
                Ok(Some(dev)) => devices.push(dev),
                Ok(None) => warn!(%address, "configuration header too short, skipping"),
                Err(e) => return Err(PfpError::bus_access(format!("{address}: {e}"))),
            }
        }

        devices.sort_by_key(|d| d.address);
        info!(devices = devices.len(), "enumerated PCI functions");
        Ok(devices)
    }
}

fn read_device(dir: &Path, address: Sbdf) -> std::io::Result<Option<RawDevice>> {
    let config = fs::read(dir.join(paths::CONFIG_ATTR))?;
    Ok(decode_config(address, &config))
}

/// Decode the standard configuration header of one function
pub fn decode_config(address: Sbdf, config: &[u8]) -> Option<RawDevice> {
    if config.len() < HEADER_SIZE {
        return None;
    }

    let byte = |off: usize| config[off];
    let word = |off: usize| u16::from_le_bytes([config[off], config[off + 1]]);

    let header = HeaderType::from_register(byte(HEADER_TYPE), byte(SECONDARY_BUS));
    let subsystem = match header {
        HeaderType::Normal => Some((word(SUBSYSTEM_VENDOR_ID), word(SUBSYSTEM_ID))),
        _ => None,
    };

    Some(RawDevice {
        address,
        header,
        class: word(CLASS_DEVICE),
        interface: byte(PROG_IF),
        vendor: word(VENDOR_ID),
        device: word(DEVICE_ID),
        subsystem,
    })
}
