// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dualflash_core::OtaState;

use crate::commands;

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "dualflash")]
#[command(version = env!("DUALFLASH_VERSION"))]
#[command(about = "Erase, program and swap banks of a simulated STM32H7 flash")]
pub struct Cli {
    /// Device image file
    #[arg(short, long, default_value = "dualflash.img")]
    pub image: PathBuf,

    /// Report the running firmware as on its first boot
    #[arg(long)]
    pub first_boot: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Create a blank device image
    Init {
        /// Flash size in KiB
        #[arg(short, long, default_value = "2048")]
        size: u32,

        /// Single-bank part (no swap)
        #[arg(long)]
        single_bank: bool,

        /// Initial content of every byte, in hex
        #[arg(long, default_value = "0xFF", value_parser = parse_hex_u8)]
        fill: u8,

        /// Overwrite an existing image
        #[arg(short, long)]
        force: bool,
    },

    /// Show geometry and bank state
    Info,

    /// Erase the sector starting at ADDRESS
    Erase {
        /// Sector start address in hex
        #[arg(value_name = "ADDRESS", value_parser = parse_hex_u32)]
        address: u32,
    },

    /// Program a binary file at ADDRESS
    Write {
        /// Target address in hex
        #[arg(value_name = "ADDRESS", value_parser = parse_hex_u32)]
        address: u32,

        /// Binary file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Compare the CRC32 of a file with the flash content at ADDRESS
    Verify {
        /// Start address in hex
        #[arg(value_name = "ADDRESS", value_parser = parse_hex_u32)]
        address: u32,

        /// Binary file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print or save flash content
    Dump {
        /// Start address in hex
        #[arg(value_name = "ADDRESS", value_parser = parse_hex_u32)]
        address: u32,

        /// Number of bytes
        #[arg(value_name = "LEN")]
        len: usize,

        /// Write raw bytes to this file instead of printing a hex dump
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Map the other bank at the flash base after the next reset
    Swap,

    /// Request a system reset
    Reset,

    /// Write, verify and activate a new image in the inactive bank
    Stage {
        /// Firmware binary file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Stop after the swap, leave the reset to the caller
        #[arg(long)]
        no_reset: bool,
    },

    /// Show the recorded operations
    Events,
}

/// Parse a hex string (with or without 0x prefix) into a u32.
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u32::from_str_radix(s, 16).map_err(|e| format!("invalid hex value: {e}"))
}

fn parse_hex_u8(s: &str) -> Result<u8, String> {
    let value = parse_hex_u32(s)?;
    u8::try_from(value).map_err(|_| format!("value out of range for a byte: 0x{value:x}"))
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    let image = cli.image.as_path();
    let status = if cli.first_boot {
        OtaState::FirstBoot
    } else {
        OtaState::Other
    };

    match cli.command {
        Commands::Init {
            size,
            single_bank,
            fill,
            force,
        } => commands::init(image, size, !single_bank, fill, force),
        Commands::Info => commands::info(image),
        Commands::Erase { address } => commands::erase(image, status, address),
        Commands::Write { address, file } => commands::write(image, status, address, &file),
        Commands::Verify { address, file } => commands::verify(image, address, &file),
        Commands::Dump {
            address,
            len,
            output,
        } => commands::dump(image, address, len, output.as_deref()),
        Commands::Swap => commands::swap(image, status),
        Commands::Reset => commands::reset(image),
        Commands::Stage { file, no_reset } => commands::stage(image, status, &file, !no_reset),
        Commands::Events => commands::events(image),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_u32() {
        assert_eq!(parse_hex_u32("0x08100000"), Ok(0x0810_0000));
        assert_eq!(parse_hex_u32("0X20"), Ok(0x20));
        assert_eq!(parse_hex_u32("ff"), Ok(0xFF));
        assert!(parse_hex_u32("0x").is_err());
        assert!(parse_hex_u32("zz").is_err());
    }

    #[test]
    fn test_parse_hex_u8() {
        assert_eq!(parse_hex_u8("0xFF"), Ok(0xFF));
        assert_eq!(parse_hex_u8("0"), Ok(0));
        assert!(parse_hex_u8("0x100").is_err());
    }

    #[test]
    fn test_cli_parses_stage() {
        let cli = Cli::try_parse_from(["dualflash", "-i", "dev.img", "stage", "fw.bin", "--no-reset"])
            .unwrap();
        assert_eq!(cli.image, PathBuf::from("dev.img"));
        assert!(matches!(
            cli.command,
            Commands::Stage { ref file, no_reset: true } if file == &PathBuf::from("fw.bin")
        ));
    }
}
