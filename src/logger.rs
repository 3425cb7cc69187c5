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

use tracing_subscriber::EnvFilter;

/// Filter directives, e.g. `PFP_LOG=pfp_core=debug`
pub const LOG_ENV: &str = "PFP_LOG";

/// Default level for a given `-v` count
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// `PFP_LOG` when set and valid, the verbosity level otherwise
pub fn env_filter(verbosity: u8) -> EnvFilter {
    let fallback = level_for(verbosity);
    match env::var(LOG_ENV) {
        Ok(directives) => EnvFilter::try_new(&directives).unwrap_or_else(|e| {
            eprintln!("pfp: ignoring {LOG_ENV}={directives}: {e}");
            EnvFilter::new(fallback)
        }),
        Err(_) => EnvFilter::new(fallback),
    }
}

/// Install the stderr subscriber; stdout is reserved for fingerprints
pub fn init_logging(verbosity: u8) {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_env_filter(env_filter(verbosity))
        .try_init();
}
