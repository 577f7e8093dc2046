// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command implementations for device operations.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use crc::{Crc, CRC_32_ISO_HDLC};
use indicatif::{ProgressBar, ProgressStyle};

use dualflash_core::sim::SimulatedFlash;
use dualflash_core::{FlashDevice, OtaState, SECTOR_SIZE, WRITE_ALIGN};

use crate::store::{with_device, Session};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);
const CHUNK_SIZE: usize = 4096;

/// Create a blank device image.
pub fn init(path: &Path, size_kib: u32, dual_bank: bool, fill: u8, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    // SNB selects one of 8 sectors per bank
    let sector_kib = SECTOR_SIZE / 1024;
    let banks = if dual_bank { 2 } else { 1 };
    let max_kib = banks * 8 * sector_kib;
    if size_kib == 0 || size_kib % (banks * sector_kib) != 0 || size_kib > max_kib {
        bail!(
            "Unsupported size {} KiB: must be a multiple of {} KiB, at most {} KiB",
            size_kib,
            banks * sector_kib,
            max_kib
        );
    }

    let image = SimulatedFlash::builder(size_kib)
        .dual_bank(dual_bank)
        .fill(fill)
        .build()
        .image();
    Session::create(path, image).save()?;

    println!(
        "Created {}: {} KiB, {}",
        path.display(),
        size_kib,
        if dual_bank { "dual bank" } else { "single bank" }
    );
    Ok(())
}

/// Display geometry and bank state.
pub fn info(path: &Path) -> Result<()> {
    let session = Session::open(path)?;
    let sim = session.device();
    let flash = FlashDevice::new(sim, sim.device_config(), OtaState::Other);
    let range = flash.range();

    println!("Device:");
    println!(
        "  Flash:       0x{:08x}..0x{:08x} ({} KiB)",
        range.start,
        range.end,
        flash.size() / 1024
    );
    println!(
        "  Sectors:     {} x {} KiB ({} per bank)",
        flash.sector_count(),
        flash.sector_size() / 1024,
        flash.sectors_per_bank()
    );
    println!("  Write align: {} bytes", flash.write_align());
    if flash.is_dual_bank() {
        println!("  Active bank: {}", flash.active_bank().number());
        if let Some(slot) = flash.inactive_region() {
            println!("  Inactive:    0x{:08x}..0x{:08x}", slot.start, slot.end);
        }
    } else {
        println!("  Banks:       single");
    }
    println!("  Resets:      {}", sim.reset_count());
    println!("  History:     {} operations", session.history().len());
    Ok(())
}

/// Erase one sector.
pub fn erase(path: &Path, status: OtaState, address: u32) -> Result<()> {
    with_device(path, status, |flash| {
        flash
            .erase(address)
            .with_context(|| format!("Erase of sector 0x{:08x} failed", address))
    })?;
    println!("Erased sector at 0x{:08x}", address);
    Ok(())
}

/// Program a file at `address`, padding the tail to the write alignment.
pub fn write(path: &Path, status: OtaState, address: u32, file: &Path) -> Result<()> {
    let data = read_padded(file)?;
    let crc32 = CRC32.checksum(&data);

    println!(
        "Firmware: {} ({} bytes, CRC32: 0x{:08x})",
        file.display(),
        data.len(),
        crc32
    );
    println!("Target:   0x{:08x}", address);
    println!();

    with_device(path, status, |flash| {
        program(flash, address, &data)?;
        check_crc(flash, address, data.len(), crc32)
    })?;

    println!("Write complete.");
    Ok(())
}

/// Compare the CRC32 of `file` with the flash content at `address`.
pub fn verify(path: &Path, address: u32, file: &Path) -> Result<()> {
    let data = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let expected = CRC32.checksum(&data);

    with_device(path, OtaState::Other, |flash| {
        check_crc(flash, address, data.len(), expected)
    })?;

    println!(
        "Verified {} bytes at 0x{:08x} (CRC32: 0x{:08x})",
        data.len(),
        address,
        expected
    );
    Ok(())
}

/// Print flash content as hex, or save it raw to `output`.
pub fn dump(path: &Path, address: u32, len: usize, output: Option<&Path>) -> Result<()> {
    let session = Session::open(path)?;
    let sim = session.device();
    let flash = FlashDevice::new(sim, sim.device_config(), OtaState::Other);

    let mut data = vec![0u8; len];
    flash
        .read(address, &mut data)
        .with_context(|| format!("Cannot read {} bytes at 0x{:08x}", len, address))?;

    match output {
        Some(out) => {
            fs::write(out, &data).with_context(|| format!("Failed to write {}", out.display()))?;
            println!("Saved {} bytes to {}", len, out.display());
        }
        None => {
            for (i, line) in data.chunks(16).enumerate() {
                let hex: Vec<String> = line.iter().map(|b| format!("{:02x}", b)).collect();
                println!("{:08x}: {}", address as usize + i * 16, hex.join(" "));
            }
        }
    }
    Ok(())
}

/// Request a bank swap.
pub fn swap(path: &Path, status: OtaState) -> Result<()> {
    let active = with_device(path, status, |flash| {
        if !flash.is_dual_bank() {
            println!("Single-bank device, nothing to swap.");
            return Ok(None);
        }
        flash.swap_bank().context("Bank swap failed")?;
        Ok(Some(flash.active_bank()))
    })?;

    if let Some(bank) = active {
        println!("Swap committed. Bank {} boots after reset.", bank.number());
    }
    Ok(())
}

/// Request a system reset.
pub fn reset(path: &Path) -> Result<()> {
    print!("Resetting device... ");
    std::io::stdout().flush()?;

    with_device(path, OtaState::Other, |flash| {
        flash.reset();
        Ok(())
    })?;

    println!("OK");
    Ok(())
}

/// Write `file` into the inactive bank, verify it, swap and reset.
pub fn stage(path: &Path, status: OtaState, file: &Path, reset: bool) -> Result<()> {
    let data = read_padded(file)?;
    let crc32 = CRC32.checksum(&data);

    let active = with_device(path, status, |flash| {
        let Some(slot) = flash.inactive_region() else {
            bail!("Device is single bank: no inactive region to stage into");
        };
        let capacity = (slot.end - slot.start) as usize;
        if data.len() > capacity {
            bail!(
                "Image is {} bytes, inactive region holds {} bytes",
                data.len(),
                capacity
            );
        }

        println!(
            "Staging {} ({} bytes, CRC32: 0x{:08x}) at 0x{:08x}",
            file.display(),
            data.len(),
            crc32,
            slot.start
        );
        program(flash, slot.start, &data)?;
        check_crc(flash, slot.start, data.len(), crc32)?;
        println!("Image verified.");

        flash.swap_bank().context("Bank swap failed")?;
        let active = flash.active_bank();
        if reset {
            flash.reset();
        }
        Ok(active)
    })?;

    println!("Bank {} is active.", active.number());
    if !reset {
        println!("Use 'dualflash --image {} reset' to restart the device.", path.display());
    }
    Ok(())
}

/// Print the operations recorded by earlier commands.
pub fn events(path: &Path) -> Result<()> {
    let session = Session::open(path)?;
    if session.history().is_empty() {
        println!("No operations recorded.");
        return Ok(());
    }

    for event in session.history() {
        println!(
            "{:<8} 0x{:08x} {:>8} bytes  {}  CR 0x{:08x} SR 0x{:08x}",
            format!("{:?}", event.op),
            event.address,
            event.len,
            if event.ok { "ok  " } else { "FAIL" },
            event.control,
            event.status
        );
    }
    Ok(())
}

fn read_padded(file: &Path) -> Result<Vec<u8>> {
    let mut data = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    if data.is_empty() {
        bail!("{} is empty", file.display());
    }
    pad_to_alignment(&mut data);
    Ok(data)
}

/// Pad with erased bytes up to the next write-alignment boundary.
fn pad_to_alignment(data: &mut Vec<u8>) {
    let align = WRITE_ALIGN as usize;
    let padded = data.len().div_ceil(align) * align;
    data.resize(padded, 0xFF);
}

fn program(flash: &mut FlashDevice<&SimulatedFlash>, address: u32, data: &[u8]) -> Result<()> {
    let pb = ProgressBar::new(data.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )?
            .progress_chars("#>-"),
    );

    for (i, chunk) in data.chunks(CHUNK_SIZE).enumerate() {
        let offset = i * CHUNK_SIZE;
        let target = address + offset as u32;
        if let Err(e) = flash.write(target, chunk) {
            pb.abandon();
            return Err(e).with_context(|| format!("Write failed at 0x{:08x}", target));
        }
        pb.set_position((offset + chunk.len()) as u64);
    }

    pb.finish_with_message("Write complete");
    Ok(())
}

fn check_crc(
    flash: &FlashDevice<&SimulatedFlash>,
    address: u32,
    len: usize,
    expected: u32,
) -> Result<()> {
    let actual = flash
        .crc32(address, len)
        .with_context(|| format!("Cannot read {} bytes at 0x{:08x}", len, address))?;
    if actual != expected {
        bail!(
            "CRC mismatch at 0x{:08x}: flash 0x{:08x}, expected 0x{:08x}",
            address,
            actual,
            expected
        );
    }
    Ok(())
}
