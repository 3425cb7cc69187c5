//! Live scan pipeline
//!
//! bus access → bus map → segment synthesis → nodes → linkage → paths.
//! A failing bus backend aborts the scan; topology inconsistencies are
//! collected and the scan still returns every node.

use pfp_error::Result;
use tracing::{debug, info};

use crate::access::{BusAccess, NameSource};
use crate::constants::stanza::NAME_SEPARATOR;
use crate::set::FingerprintSet;
use crate::topology::{BusMap, TopologyIssue};

/// Result of scanning a host
#[derive(Debug, Clone, Default)]
pub struct Scan {
    pub set: FingerprintSet,
    pub issues: Vec<TopologyIssue>,
}

/// Build a linked, path-encoded fingerprint of everything `bus` reports
pub fn scan(bus: &dyn BusAccess) -> Result<Scan> {
    let devices = bus.devices()?;
    let mut map = BusMap::new(devices);
    map.resolve_segments();
    debug!(buses = map.len(), "bus map built");

    let mut set = FingerprintSet::from_nodes(map.into_nodes());
    let mut issues = set.link();
    issues.extend(set.encode_paths());

    info!(
        nodes = set.count(),
        issues = issues.len(),
        "scan complete"
    );
    Ok(Scan { set, issues })
}

/// Attach names from `source` to every addressed node without one
///
/// Lookup failures are logged and leave the node unnamed.
pub fn fill_names(set: &mut FingerprintSet, source: &dyn NameSource) {
    for node in set.nodes_mut() {
        let Some(slot) = node.slot else { continue };
        if node.name.is_some() {
            continue;
        }
        match source.names(&slot) {
            Ok(names) if !names.is_empty() => node.name = Some(names.join(NAME_SEPARATOR)),
            Ok(_) => {}
            Err(e) => debug!(%slot, error = %e, "name lookup failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{MockBusAccess, MockNameSource};
    use crate::address::Sbdf;
    use crate::topology::{HeaderType, RawDevice};
    use pfp_error::PfpError;

    fn raw(bus: u8, dev: u8, func: u8, header: HeaderType) -> RawDevice {
        RawDevice {
            address: Sbdf::new(0, bus, dev, func),
            header,
            class: 0x0600,
            interface: 0,
            vendor: 0x8086,
            device: 0x1234,
            subsystem: None,
        }
    }

    fn host() -> Vec<RawDevice> {
        vec![
            raw(3, 0, 0, HeaderType::Normal),
            raw(0, 0, 0, HeaderType::Normal),
            raw(0, 0x1c, 0, HeaderType::Bridge { secondary: 3 }),
            // bus 5 has no bridge: virtual host bridge segment
            raw(5, 0, 0, HeaderType::Normal),
        ]
    }

    #[test]
    fn test_scan_links_and_encodes() {
        let mut bus = MockBusAccess::new();
        bus.expect_devices().times(1).returning(|| Ok(host()));

        let Scan { mut set, issues } = scan(&bus).unwrap();
        assert!(issues.is_empty());
        set.sort();

        let paths: Vec<_> = set.iter().map(|n| n.path.clone().unwrap()).collect();
        assert_eq!(paths, vec!["0/0.0", "0/1c.0", "0/1c.0/0.0", "c1/0.0"]);

        let leaf = set.search(&Sbdf::new(0, 3, 0, 0)).unwrap();
        assert_eq!(set.parent_of(leaf).unwrap().slot, Some(Sbdf::new(0, 0, 0x1c, 0)));
        assert_eq!(set.search(&Sbdf::new(0, 5, 0, 0)).unwrap().segment, 0xc1);
    }

    #[test]
    fn test_scan_bus_failure_produces_nothing() {
        let mut bus = MockBusAccess::new();
        bus.expect_devices()
            .returning(|| Err(PfpError::bus_access("no pci access")));
        assert!(matches!(scan(&bus), Err(PfpError::BusAccess(_))));
    }

    #[test]
    fn test_scan_reports_inconsistency_but_keeps_nodes() {
        let mut bus = MockBusAccess::new();
        // bridge on bus 1 forwards to bus 1
        bus.expect_devices().returning(|| {
            Ok(vec![
                raw(0, 1, 0, HeaderType::Bridge { secondary: 1 }),
                raw(1, 0, 0, HeaderType::Bridge { secondary: 1 }),
                raw(1, 2, 0, HeaderType::Normal),
            ])
        });

        let result = scan(&bus).unwrap();
        assert_eq!(result.set.count(), 3);
        assert_eq!(result.issues, vec![TopologyIssue::SelfParent { slot: Sbdf::new(0, 1, 0, 0) }]);

        let tail = result.set.search(&Sbdf::new(0, 1, 2, 0)).unwrap();
        assert_eq!(tail.path.as_deref(), Some("B/2.0"));
    }

    #[test]
    fn test_fill_names_joins_and_tolerates_failure() {
        let mut bus = MockBusAccess::new();
        bus.expect_devices().returning(|| Ok(host()));
        let mut set = scan(&bus).unwrap().set;

        let mut names = MockNameSource::new();
        names.expect_names().returning(|slot| match (slot.bus, slot.device) {
            (3, 0) => Ok(vec!["net enp3s0".to_string(), "hwmon hwmon2".to_string()]),
            (5, _) => Err(PfpError::bus_access("gone")),
            _ => Ok(Vec::new()),
        });
        fill_names(&mut set, &names);

        let leaf = set.search(&Sbdf::new(0, 3, 0, 0)).unwrap();
        assert_eq!(leaf.name.as_deref(), Some("net enp3s0, hwmon hwmon2"));
        assert!(set.search(&Sbdf::new(0, 5, 0, 0)).unwrap().name.is_none());
        assert!(set.search(&Sbdf::new(0, 0, 0, 0)).unwrap().name.is_none());
    }
}
