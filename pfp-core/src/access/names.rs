//! sysfs name source
//!
//! Every class device under `/sys/class/<class>/<entry>` links back to the
//! function it belongs to through its `device` symlink. A function's names
//! are the `"<class> <entry>"` pairs whose link ends in the function's
//! address, e.g. `net enp2s0` or `drm card0`.

use std::fs;
use std::path::PathBuf;

use pfp_error::Result;
use tracing::trace;

use super::NameSource;
use crate::address::Sbdf;
use crate::constants::paths;

/// [`NameSource`] over `/sys/class`
#[derive(Debug, Clone)]
pub struct SysfsNames {
    root: PathBuf,
    class_filter: Option<String>,
}

impl SysfsNames {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            class_filter: None,
        }
    }

    /// Only report names from one device class (`net`, `block`, ...)
    pub fn with_class(mut self, class: Option<String>) -> Self {
        self.class_filter = class;
        self
    }
}

impl NameSource for SysfsNames {
    fn names(&self, slot: &Sbdf) -> Result<Vec<String>> {
        let wanted = slot.to_string();
        let mut names = Vec::new();

        for class in fs::read_dir(self.root.join(paths::CLASS))? {
            let class = class?;
            let class_name = class.file_name().to_string_lossy().into_owned();
            if self.class_filter.as_ref().is_some_and(|f| *f != class_name) {
                continue;
            }

            let Ok(entries) = fs::read_dir(class.path()) else {
                continue;
            };
            for entry in entries.flatten() {
                let Ok(target) = fs::read_link(entry.path().join("device")) else {
                    continue;
                };
                if target.file_name().is_some_and(|n| n.to_string_lossy() == wanted) {
                    let entry_name = entry.file_name().to_string_lossy().into_owned();
                    trace!(%slot, class = %class_name, entry = %entry_name, "name found");
                    names.push(format!("{class_name} {entry_name}"));
                }
            }
        }

        names.sort();
        Ok(names)
    }
}
