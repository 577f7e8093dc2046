// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Host tool for the dualflash engine.
//!
//! Every command loads a simulated device from an image file, runs the
//! engine against it and writes the image back.

mod cli;
mod commands;
mod store;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::run(cli)
}
