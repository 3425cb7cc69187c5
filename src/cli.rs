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

//! Command Line Interface
//!
//! Argument definitions and the command implementations behind them.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context as _};
use clap::{ArgAction, Parser, Subcommand};
use tracing::{debug, info};

use pfp_core::codec::write_stanza;
use pfp_core::{
    codec, convert_lspci, fill_names, identify, match_sets, scan, show, to_json, BusAccess,
    FingerprintSet, MatchMode, NameSource, Sbdf, ShowOptions, SysfsBus, SysfsNames,
};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "pfp")]
#[command(version)]
#[command(about = "pfp - PCI topology fingerprinting")]
#[command(long_about = "pfp - PCI topology fingerprinting

Describes the PCI devices of a machine by their position in the bus
hierarchy, and checks a machine against patterns of partially specified
devices.

EXAMPLES:
    pfp scan > board.pfp               Save this machine's fingerprint
    pfp parse board.pfp                Normalise a fingerprint file
    pfp -v match board.pfp             Match this machine, print size and rank
    pfp identify /etc/pfp/patterns     Find the most specific matching pattern
    pfp search 0:1f.3                  Show one scanned function
    lspci -nm | pfp convert            Turn lspci output into stanzas

EXIT STATUS:
    0    success, or a complete match
    2    no match (match, identify, search)
    1    failure

ENVIRONMENT VARIABLES:
    PFP_LOG=debug          Log filter directives (stderr)
    PFP_CONFIG=FILE        Configuration file

FILES:
    ~/.config/pfp/config.json          Configuration")]
#[command(propagate_version = true)]
pub struct Cli {
    /// More detail; repeat for more
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Complete only when matching pairs equal the pattern size
    #[arg(long, global = true, conflicts_with = "at_least")]
    pub exact: bool,

    /// Complete when every pattern stanza matches at least one device
    #[arg(long, global = true)]
    pub at_least: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Command line flags win over the configured mode
    pub fn match_mode(&self, configured: MatchMode) -> MatchMode {
        if self.exact {
            MatchMode::Exact
        } else if self.at_least {
            MatchMode::AtLeast
        } else {
            configured
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan the PCI bus and print its fingerprint
    Scan {
        /// Print JSON instead of stanzas
        #[arg(long)]
        json: bool,
    },
    /// Parse a fingerprint and print it back
    Parse {
        /// Fingerprint file (stdin when omitted)
        file: Option<PathBuf>,
    },
    /// Match this machine against a pattern
    Match {
        /// Pattern file (stdin when omitted)
        file: Option<PathBuf>,
    },
    /// Find the most specific matching pattern in a directory
    Identify {
        /// Pattern directory (configured `pattern_dir` when omitted)
        dir: Option<PathBuf>,
    },
    /// Show the scanned function at an address
    Search {
        /// Address as [[segment:]bus:]device.function
        slot: Sbdf,
    },
    /// Convert `lspci -nm` output to stanzas
    Convert {
        /// lspci output (stdin when omitted)
        file: Option<PathBuf>,
    },
}

/// How a successful command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    NoMatch,
}

impl Outcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Success => ExitCode::SUCCESS,
            Outcome::NoMatch => ExitCode::from(2),
        }
    }
}

/// Everything a command needs besides its own arguments
pub struct Context {
    pub bus: Box<dyn BusAccess>,
    pub names: Option<Box<dyn NameSource>>,
    pub show: ShowOptions,
    pub mode: MatchMode,
    pub pattern_dir: Option<PathBuf>,
}

impl Context {
    /// sysfs backends under the configured root
    pub fn new(cli: &Cli, config: &Config) -> Self {
        let names: Option<Box<dyn NameSource>> = if config.fill_names {
            Some(Box::new(
                SysfsNames::new(&config.sysfs_root).with_class(config.name_class.clone()),
            ))
        } else {
            None
        };
        Self {
            bus: Box::new(SysfsBus::new(&config.sysfs_root)),
            names,
            show: ShowOptions::new(cli.verbose.saturating_add(config.verbosity)),
            mode: cli.match_mode(config.match_mode),
            pattern_dir: config.pattern_dir.clone(),
        }
    }
}

pub fn run_cli<W: Write>(cmd: &Commands, ctx: &Context, out: &mut W) -> anyhow::Result<Outcome> {
    match cmd {
        Commands::Scan { json } => cmd_scan(ctx, *json, out),
        Commands::Parse { file } => cmd_parse(ctx, file.as_deref(), out),
        Commands::Match { file } => cmd_match(ctx, file.as_deref(), out),
        Commands::Identify { dir } => cmd_identify(ctx, dir.as_deref(), out),
        Commands::Search { slot } => cmd_search(ctx, slot, out),
        Commands::Convert { file } => cmd_convert(ctx, file.as_deref(), out),
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Scan, name and sort the host
pub fn scan_host(ctx: &Context) -> anyhow::Result<FingerprintSet> {
    let result = scan(ctx.bus.as_ref()).context("pfp scan")?;
    if !result.issues.is_empty() {
        info!(issues = result.issues.len(), "topology is inconsistent; affected paths are marked B");
    }
    let mut set = result.set;
    if let Some(names) = &ctx.names {
        fill_names(&mut set, names.as_ref());
    }
    set.sort();
    Ok(set)
}

fn open_input(file: Option<&Path>) -> anyhow::Result<Box<dyn BufRead>> {
    match file {
        Some(path) => {
            let f = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
            Ok(Box::new(BufReader::new(f)))
        }
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

fn read_fingerprint(file: Option<&Path>) -> anyhow::Result<FingerprintSet> {
    let set = match file {
        Some(path) => codec::parse_file(path),
        None => codec::parse(open_input(None)?),
    };
    set.context("pfp parse")
}

fn write_score<W: Write>(out: &mut W, size: usize, rank: usize) -> io::Result<()> {
    writeln!(out, "pattern size = {size}")?;
    writeln!(out, "match rank = {rank}")
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_scan<W: Write>(ctx: &Context, json: bool, out: &mut W) -> anyhow::Result<Outcome> {
    let host = scan_host(ctx)?;
    if json {
        writeln!(out, "{}", to_json(&host)?)?;
    } else {
        show(&host, out, &ctx.show)?;
    }
    Ok(Outcome::Success)
}

fn cmd_parse<W: Write>(ctx: &Context, file: Option<&Path>, out: &mut W) -> anyhow::Result<Outcome> {
    let set = read_fingerprint(file)?;
    show(&set, out, &ctx.show)?;
    Ok(Outcome::Success)
}

fn cmd_match<W: Write>(ctx: &Context, file: Option<&Path>, out: &mut W) -> anyhow::Result<Outcome> {
    let host = scan_host(ctx)?;
    let pattern = read_fingerprint(file)?;
    let report = match_sets(&host, &pattern);

    if ctx.show.verbosity > 0 {
        write_score(out, report.size, report.rank)?;
    }
    Ok(if report.is_complete(ctx.mode) {
        Outcome::Success
    } else {
        Outcome::NoMatch
    })
}

fn cmd_identify<W: Write>(ctx: &Context, dir: Option<&Path>, out: &mut W) -> anyhow::Result<Outcome> {
    let dir = dir
        .or(ctx.pattern_dir.as_deref())
        .ok_or_else(|| anyhow!("no pattern directory given and none configured"))?;
    let host = scan_host(ctx)?;

    match identify(&host, dir, ctx.mode).with_context(|| format!("identify in {}", dir.display()))? {
        Some(found) => {
            writeln!(out, "{}", found.path.display())?;
            if ctx.show.verbosity > 0 {
                write_score(out, found.report.size, found.report.rank)?;
            }
            Ok(Outcome::Success)
        }
        None => {
            debug!(dir = %dir.display(), "no pattern matched");
            Ok(Outcome::NoMatch)
        }
    }
}

fn cmd_search<W: Write>(ctx: &Context, slot: &Sbdf, out: &mut W) -> anyhow::Result<Outcome> {
    let host = scan_host(ctx)?;
    match host.search(slot) {
        Some(node) => {
            write_stanza(node, out, &ctx.show)?;
            Ok(Outcome::Success)
        }
        None => {
            debug!(%slot, "no such function");
            Ok(Outcome::NoMatch)
        }
    }
}

fn cmd_convert<W: Write>(ctx: &Context, file: Option<&Path>, out: &mut W) -> anyhow::Result<Outcome> {
    let set = convert_lspci(open_input(file)?).context("pfp convert")?;
    // lspci reports subsystem ids as-is; keep them all
    let opts = ShowOptions::new(ctx.show.verbosity.max(2));
    show(&set, out, &opts)?;
    Ok(Outcome::Success)
}
