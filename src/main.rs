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

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;

use pfp::cli::{self, Cli, Context};
use pfp::config::load_config;
use pfp::logger;

fn main() -> ExitCode {
    let args = Cli::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("pfp: {e}");
            return ExitCode::FAILURE;
        }
    };
    logger::init_logging(args.verbose.saturating_add(config.verbosity));

    let ctx = Context::new(&args, &config);
    let mut out = io::stdout().lock();
    let result = cli::run_cli(&args.command, &ctx, &mut out).and_then(|outcome| {
        out.flush()?;
        Ok(outcome)
    });

    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            eprintln!("pfp: {e:#}");
            ExitCode::FAILURE
        }
    }
}
