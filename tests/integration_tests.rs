/*
 * Integration tests for pfp
 *
 * These tests drive the public engine end to end: a scan over a fixed
 * bus, the text format in both directions, and matching.
 */

use pfp::cli::{run_cli, Commands, Context, Outcome};
use pfp_core::codec::{parse_str, to_text};
use pfp_core::{
    match_sets, scan, synthesize_segment, BusAccess, FingerprintNode, FingerprintSet, HeaderType,
    MatchMode, PfpError, RawDevice, Result, Sbdf, ShowOptions,
};

// Test utilities
struct FixedBus(Vec<RawDevice>);

impl BusAccess for FixedBus {
    fn devices(&self) -> Result<Vec<RawDevice>> {
        Ok(self.0.clone())
    }
}

struct DeadBus;

impl BusAccess for DeadBus {
    fn devices(&self) -> Result<Vec<RawDevice>> {
        Err(PfpError::bus_access("permission denied"))
    }
}

fn device(bus: u8, dev: u8, func: u8, class: u16, vendor: u16, id: u16) -> RawDevice {
    RawDevice {
        address: Sbdf::new(0, bus, dev, func),
        header: HeaderType::Normal,
        class,
        interface: 0,
        vendor,
        device: id,
        subsystem: Some((0x1028, 0x0869)),
    }
}

fn bridge(bus: u8, dev: u8, secondary: u8) -> RawDevice {
    RawDevice {
        header: HeaderType::Bridge { secondary },
        subsystem: None,
        ..device(bus, dev, 0, 0x0604, 0x8086, 0xa110)
    }
}

/// Laptop-like host: root complex, two root ports, a NIC and an NVMe
/// controller behind them, plus a segment without a bridge on bus 0x80
fn laptop() -> FixedBus {
    FixedBus(vec![
        device(0x80, 0, 0, 0x0108, 0x144d, 0xa808),
        device(2, 0, 0, 0x0200, 0x10ec, 0x8168),
        bridge(0, 0x1d, 3),
        device(0, 0, 0, 0x0600, 0x8086, 0x3e0f),
        bridge(0, 0x1c, 2),
        device(3, 0, 0, 0x0108, 0x144d, 0xa808),
        device(0, 0x1f, 3, 0x0403, 0x8086, 0xa348),
    ])
}

fn scanned() -> FingerprintSet {
    let mut set = scan(&laptop()).unwrap().set;
    set.sort();
    set
}

fn context(mode: MatchMode) -> Context {
    Context {
        bus: Box::new(laptop()),
        names: None,
        show: ShowOptions::default(),
        mode,
        pattern_dir: None,
    }
}

#[test]
fn test_linkage_follows_bridges() {
    let set = scanned();
    let nic = set.search(&Sbdf::new(0, 2, 0, 0)).unwrap();
    assert_eq!(nic.parent, Some(Sbdf::new(0, 0, 0x1c, 0)));
    assert_eq!(set.parent_of(nic).unwrap().slot, nic.parent);

    let nvme = set.search(&Sbdf::new(0, 3, 0, 0)).unwrap();
    assert_eq!(set.parent_of(nvme).unwrap().slot, Some(Sbdf::new(0, 0, 0x1d, 0)));

    let root_port = set.search(&Sbdf::new(0, 0, 0x1c, 0)).unwrap();
    assert!(root_port.parent.is_none());
    assert!(set.parent_of(root_port).is_none());
}

#[test]
fn test_paths_and_sort_order() {
    let set = scanned();
    let paths: Vec<_> = set.iter().map(|n| n.path.as_deref().unwrap()).collect();
    assert_eq!(
        paths,
        vec!["0/0.0", "0/1c.0", "0/1c.0/0.0", "0/1d.0", "0/1d.0/0.0", "0/1f.3", "2/0.0"]
    );
}

#[test]
fn test_orphan_bus_gets_synthesized_segment() {
    let set = scanned();
    let disk = set.search(&Sbdf::new(0, 0x80, 0, 0)).unwrap();
    assert_eq!(disk.segment, u32::from(synthesize_segment(0x80)));
    assert_eq!(disk.segment, 0x02);
    assert_eq!(synthesize_segment(5), 0xc1);
}

#[test]
fn test_encoding_is_deterministic() {
    let mut a = scanned();
    let b = scanned();
    assert_eq!(to_text(&a, &ShowOptions::new(2)), to_text(&b, &ShowOptions::new(2)));

    let before: Vec<_> = a.iter().map(|n| n.path.clone()).collect();
    assert!(a.encode_paths().is_empty());
    let after: Vec<_> = a.iter().map(|n| n.path.clone()).collect();
    assert_eq!(before, after);
}

#[test]
fn test_show_parse_round_trip_matches_itself() {
    let host = scanned();
    let text = to_text(&host, &ShowOptions::new(2));
    let parsed = parse_str(&text).unwrap();

    assert_eq!(parsed.count(), host.count());
    assert_eq!(to_text(&parsed, &ShowOptions::new(2)), text);

    let report = match_sets(&host, &parsed);
    assert_eq!(report.size, host.count());
    assert!(report.is_complete(MatchMode::AtLeast));
}

#[test]
fn test_wildcard_pattern() {
    let host = scanned();
    let pattern = parse_str("path\t= 0/1c.0/0.0\nvendor\t= 10ec\n").unwrap();
    let report = match_sets(&host, &pattern);
    assert_eq!((report.rank, report.size), (1, 1));
    assert!(report.is_complete(MatchMode::Exact));
}

#[test]
fn test_multiplicity() {
    let host = scanned();
    // both NVMe controllers match one stanza
    let pattern = FingerprintSet::from_nodes(vec![FingerprintNode::pattern().with_ids(0x144d, 0xa808)]);
    let report = match_sets(&host, &pattern);
    assert_eq!(report.rank, 2);
    assert!(!report.is_complete(MatchMode::Exact));
    assert!(report.is_complete(MatchMode::AtLeast));
}

#[test]
fn test_sort_by_path_bytes() {
    let mut set = parse_str("path\t= 1/0.0\n\npath\t= 0/2.0\n\npath\t= 0/1.0\n").unwrap();
    set.sort();
    let paths: Vec<_> = set.iter().map(|n| n.path.as_deref().unwrap()).collect();
    assert_eq!(paths, vec!["0/1.0", "0/2.0", "1/0.0"]);
}

#[test]
fn test_bus_failure_is_fatal() {
    assert!(matches!(scan(&DeadBus), Err(PfpError::BusAccess(_))));

    let ctx = Context {
        bus: Box::new(DeadBus),
        ..context(MatchMode::Exact)
    };
    assert!(run_cli(&Commands::Scan { json: false }, &ctx, &mut Vec::new()).is_err());
}

#[test]
fn test_cli_match_against_saved_scan() {
    let dir = tempfile::tempdir().unwrap();
    let saved = dir.path().join("laptop.pfp");

    let mut out = Vec::new();
    run_cli(&Commands::Scan { json: false }, &context(MatchMode::Exact), &mut out).unwrap();
    std::fs::write(&saved, &out).unwrap();

    let cmd = Commands::Match { file: Some(saved) };
    assert_eq!(run_cli(&cmd, &context(MatchMode::AtLeast), &mut Vec::new()).unwrap(), Outcome::Success);
}
