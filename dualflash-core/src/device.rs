// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! The flash device handle.
//!
//! There is one `FlashDevice` per process. It owns the register backend, the
//! sticky unlock flag and the diagnostics journal. Mutating operations take
//! `&mut self`; the engine assumes a single writer and must not be entered
//! from an interrupt handler while another call is in progress.

use crc::{Crc, CRC_32_ISO_HDLC};

use crate::event::{FlashEvent, Journal, Operation};
use crate::geometry::DeviceConfig;
use crate::ota::OtaState;
use crate::regs::{Bank, RegisterFile, CR, SR};
use crate::Error;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

pub struct FlashDevice<R, S = OtaState> {
    pub(crate) regs: R,
    pub(crate) config: DeviceConfig,
    pub(crate) status: S,
    pub(crate) unlocked: bool,
    pub(crate) journal: Journal,
}

impl<R: RegisterFile, S> FlashDevice<R, S> {
    pub fn new(regs: R, config: DeviceConfig, status: S) -> Self {
        Self {
            regs,
            config,
            status,
            unlocked: false,
            journal: Journal::new(),
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// Give the register backend back.
    pub fn release(self) -> R {
        self.regs
    }

    /// Whether the key sequence has been written, or skipped by policy.
    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    /// Most recent operation outcome.
    pub fn last_event(&self) -> Option<&FlashEvent> {
        self.journal.last()
    }

    /// Recorded operations, oldest first.
    pub fn events(&self) -> impl Iterator<Item = &FlashEvent> + '_ {
        self.journal.iter()
    }

    pub fn clear_events(&mut self) {
        self.journal.clear();
    }

    /// Read bytes from the flash array starting at `address`.
    pub fn read(&self, address: u32, buf: &mut [u8]) -> Result<(), Error> {
        self.check_span(address, buf.len())?;
        let mut addr = address;
        for byte in buf.iter_mut() {
            let word = self.regs.read(addr & !3);
            *byte = word.to_le_bytes()[(addr & 3) as usize];
            addr += 1;
        }
        Ok(())
    }

    /// CRC-32 (ISO HDLC) over `len` bytes of flash starting at `address`.
    pub fn crc32(&self, address: u32, len: usize) -> Result<u32, Error> {
        self.check_span(address, len)?;
        let mut digest = CRC32.digest();
        let mut chunk = [0u8; 256];
        let mut addr = address;
        let mut remaining = len;

        while remaining > 0 {
            let n = remaining.min(chunk.len());
            self.read(addr, &mut chunk[..n])?;
            digest.update(&chunk[..n]);
            addr += n as u32;
            remaining -= n;
        }

        Ok(digest.finalize())
    }

    /// `address..address + len` must lie inside the array.
    pub(crate) fn check_span(&self, address: u32, len: usize) -> Result<(), Error> {
        let range = self.range();
        if !range.contains(&address) {
            return Err(Error::OutOfRange { address });
        }
        let len = u32::try_from(len).map_err(|_| Error::OutOfRange { address })?;
        match address.checked_add(len) {
            Some(end) if end <= range.end => Ok(()),
            _ => Err(Error::OutOfRange { address }),
        }
    }

    pub(crate) fn record(&mut self, op: Operation, address: u32, len: u32, bank: Bank, ok: bool) {
        let event = FlashEvent {
            op,
            address,
            len,
            ok,
            control: self.regs.read(bank.reg(CR)),
            status: self.regs.read(bank.reg(SR)),
        };
        self.journal.record(event);
    }
}
