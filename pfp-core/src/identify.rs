//! Batch identification against a directory of pattern files
//!
//! Each file is parsed and scored on its own. Among the files that match
//! completely, the one with the most stanzas is the most specific and wins;
//! on a tie the first file in path order is kept.

use std::fs;
use std::path::{Path, PathBuf};

use pfp_error::{PfpError, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::codec;
use crate::set::{match_sets, FingerprintSet, MatchMode, MatchReport};

/// Best complete match found by [`identify`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identification {
    pub path: PathBuf,
    pub report: MatchReport,
}

/// Find the most specific pattern file under `dir` that `reference` matches
pub fn identify(reference: &FingerprintSet, dir: &Path, mode: MatchMode) -> Result<Option<Identification>> {
    let mut files = Vec::new();
    collect_files(dir, &mut files)?;
    files.sort();

    let mut best: Option<Identification> = None;
    for path in files {
        let pattern = match codec::parse_file(&path) {
            Ok(pattern) => pattern,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable pattern");
                continue;
            }
        };
        if pattern.is_empty() {
            debug!(path = %path.display(), "skipping empty pattern");
            continue;
        }

        let report = match_sets(reference, &pattern);
        debug!(path = %path.display(), rank = report.rank, size = report.size, "pattern evaluated");
        if !report.is_complete(mode) {
            continue;
        }
        if best.as_ref().map_or(true, |b| report.size > b.report.size) {
            best = Some(Identification { path, report });
        }
    }

    if let Some(found) = &best {
        info!(path = %found.path.display(), size = found.report.size, "identified");
    }
    Ok(best)
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| PfpError::file_read(dir, e))?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let kind = entry.file_type()?;
        if kind.is_dir() {
            collect_files(&path, out)?;
        } else if kind.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Sbdf;
    use crate::node::FingerprintNode;

    fn reference() -> FingerprintSet {
        let mut set = FingerprintSet::from_nodes(vec![
            FingerprintNode::pattern()
                .with_slot(Sbdf::new(0, 0, 0, 0))
                .with_class(0x0600, Some(0))
                .with_ids(0x8086, 0x2918),
            FingerprintNode::pattern()
                .with_slot(Sbdf::new(0, 0, 0x1f, 0))
                .with_class(0x0601, Some(0))
                .with_ids(0x8086, 0x2916),
        ]);
        set.link();
        set.encode_paths();
        set
    }

    fn write(dir: &Path, rel: &str, text: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    #[test]
    fn test_most_specific_complete_match_wins() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "generic/ich9", "vendor\t= 8086\ndevice\t= 2916\n");
        write(dir.path(), "boards/q35", "path\t= 0/0.0\ndevice\t= 2918\n\npath\t= 0/1f.0\ndevice\t= 2916\n");
        write(dir.path(), "boards/other", "path\t= 0/0.0\ndevice\t= 29c0\n");
        write(dir.path(), "broken", "what is this\n");
        write(dir.path(), "empty", "# nothing\n");

        let found = identify(&reference(), dir.path(), MatchMode::Exact).unwrap().unwrap();
        assert_eq!(found.path, dir.path().join("boards/q35"));
        assert_eq!(found.report, MatchReport { rank: 2, size: 2, satisfied: 2 });
    }

    #[test]
    fn test_no_complete_match() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "other", "vendor\t= 10de\n");
        assert!(identify(&reference(), dir.path(), MatchMode::Exact).unwrap().is_none());
    }

    #[test]
    fn test_mode_changes_outcome() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "intel", "vendor\t= 8086\n");
        assert!(identify(&reference(), dir.path(), MatchMode::Exact).unwrap().is_none());
        let found = identify(&reference(), dir.path(), MatchMode::AtLeast).unwrap().unwrap();
        assert_eq!(found.report.rank, 2);
    }

    #[test]
    fn test_missing_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(identify(&reference(), &dir.path().join("missing"), MatchMode::Exact).is_err());
    }
}
