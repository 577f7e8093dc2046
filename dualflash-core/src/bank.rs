// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Address to bank and bank-local sector resolution.

use crate::device::FlashDevice;
use crate::geometry::SECTOR_SIZE;
use crate::regs::{Bank, RegisterFile, CR_SNB};
use crate::Error;

impl<R: RegisterFile, S> FlashDevice<R, S> {
    /// Register block controlling `address`. Bank 1 owns the lower half of
    /// the array on dual-bank parts, and everything otherwise.
    pub fn bank_of(&self, address: u32) -> Bank {
        if !self.config.dual_bank {
            return Bank::One;
        }
        let offset = address.wrapping_sub(self.start());
        if offset < self.size() / 2 {
            Bank::One
        } else {
            Bank::Two
        }
    }

    /// Zero-based sector index of `address` within its bank.
    pub fn sector_index_of(&self, address: u32) -> u32 {
        let index = address.wrapping_sub(self.start()) / SECTOR_SIZE;
        let per_bank = self.sectors_per_bank();
        if self.config.dual_bank && index >= per_bank {
            index - per_bank
        } else {
            index
        }
    }

    /// Bank and bank-local index for an erase of the sector at `address`.
    ///
    /// Refuses sectors the controller cannot select: a local index wider
    /// than SNB, or a sector straddling the half-size bank split (possible
    /// when a bank is not a whole number of sectors).
    pub(crate) fn resolve_sector(&self, address: u32) -> Result<(Bank, u32), Error> {
        if !self.is_sector_start(address) {
            return Err(if self.contains(address) {
                Error::Misaligned { address }
            } else {
                Error::OutOfRange { address }
            });
        }

        let bank = self.bank_of(address);
        let index = (address - self.start()) / SECTOR_SIZE;
        let owner = if self.config.dual_bank && index >= self.sectors_per_bank() {
            Bank::Two
        } else {
            Bank::One
        };
        let sector = self.sector_index_of(address);
        if owner != bank || sector > CR_SNB.decode(u32::MAX) {
            return Err(Error::OutOfRange { address });
        }
        Ok((bank, sector))
    }
}
