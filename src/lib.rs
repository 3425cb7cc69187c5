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

//! pfp - PCI topology fingerprinting
//!
//! Command line front end over `pfp-core`: argument parsing, configuration
//! and logging setup.

pub mod cli;
pub mod config;
pub mod logger;
