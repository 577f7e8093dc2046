// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Sector erase.

use crate::device::FlashDevice;
use crate::event::{log_rejected, Operation};
use crate::geometry::SECTOR_SIZE;
use crate::ota::OtaStatus;
use crate::regs::{RegisterFile, CR, CR_SER, CR_SNB, CR_START};
use crate::Error;

impl<R: RegisterFile, S: OtaStatus> FlashDevice<R, S> {
    /// Erase the sector starting at `address`.
    ///
    /// Interrupts stay enabled for the whole erase. On failure the sector
    /// content is undefined. Sectors whose bank-local index does not fit the
    /// 3-bit SNB field, or that straddle the bank split, are refused.
    pub fn erase(&mut self, address: u32) -> Result<(), Error> {
        let (bank, sector) = match self.resolve_sector(address) {
            Ok(location) => location,
            Err(error) => {
                log_rejected(Operation::Erase, &error);
                return Err(error);
            }
        };
        let cr = bank.reg(CR);

        self.unlock();
        self.clear_errors(bank);
        // SNB is replaced, not OR-ed, so a previous erase on this bank
        // cannot leave stale sector bits behind.
        self.regs.write_field(cr, CR_SNB, sector);
        self.regs.set_bits(cr, CR_SER);
        self.regs.set_bits(cr, CR_START);

        let result = self.complete(bank);
        // SER must not stay set next to PG when erasing from inside a write.
        self.regs.clear_bits(cr, CR_SER);
        self.record(Operation::Erase, address, SECTOR_SIZE, bank, result.is_ok());
        result
    }
}
