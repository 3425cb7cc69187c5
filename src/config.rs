/*
 * This file is part of pfp.
 *
 * Copyright (C) 2025 pfp contributors
 *
 * pfp is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * pfp is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with pfp. If not, see <https://www.gnu.org/licenses/>.
 */

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use pfp_core::constants::paths::SYSFS_ROOT;
use pfp_core::MatchMode;
use pfp_error::{PfpError, Result};
use serde::{Deserialize, Serialize};

pub const CONFIG_ENV: &str = "PFP_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Added to the `-v` count
    pub verbosity: u8,
    pub match_mode: MatchMode,
    /// Default directory for `identify`
    pub pattern_dir: Option<PathBuf>,
    /// Mount point used by both sysfs backends
    pub sysfs_root: PathBuf,
    /// Attach `/sys/class` names to scanned devices
    pub fill_names: bool,
    /// Only take names from this device class
    pub name_class: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            verbosity: 0,
            match_mode: MatchMode::default(),
            pattern_dir: None,
            sysfs_root: PathBuf::from(SYSFS_ROOT),
            fill_names: true,
            name_class: None,
        }
    }
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = env::var(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        return Path::new(&xdg).join("pfp").join("config.json");
    }
    if let Ok(home) = env::var("HOME") {
        return Path::new(&home).join(".config").join("pfp").join("config.json");
    }
    PathBuf::from("/etc/pfp/config.json")
}

/// Load the configuration
///
/// An explicit path must exist. A discovered path that does not exist gives
/// the defaults; one that exists but does not parse is an error.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    match explicit {
        Some(path) => read_config(path),
        None => {
            let path = config_path();
            match read_config(&path) {
                Err(PfpError::FileRead { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                    Ok(Config::default())
                }
                other => other,
            }
        }
    }
}

pub fn read_config(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path).map_err(|e| PfpError::file_read(path, e))?;
    let cfg: Config = serde_json::from_str(&data)?;
    validate_config(&cfg)?;
    Ok(cfg)
}

pub fn validate_config(cfg: &Config) -> Result<()> {
    if cfg.sysfs_root.as_os_str().is_empty() {
        return Err(PfpError::config("sysfs_root must not be empty"));
    }
    if let Some(dir) = &cfg.pattern_dir {
        if dir.as_os_str().is_empty() {
            return Err(PfpError::config("pattern_dir must not be empty"));
        }
    }
    if let Some(class) = &cfg.name_class {
        if class.is_empty() || class.contains('/') {
            return Err(PfpError::config(format!("invalid name_class `{class}`")));
        }
    }
    Ok(())
}
