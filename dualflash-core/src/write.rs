// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Programming with lazy sector erase.

use crate::device::FlashDevice;
use crate::event::{log_rejected, Operation};
use crate::geometry::{SECTOR_SIZE, WORD_SIZE};
use crate::ota::OtaStatus;
use crate::regs::{Bank, RegisterFile, CR, CR_PG};
use crate::Error;

impl<R: RegisterFile, S: OtaStatus> FlashDevice<R, S> {
    /// Program `data` at `address`.
    ///
    /// `data.len()` must be a non-zero multiple of [`write_align`]. Each time
    /// the destination reaches the start of a sector, that sector is erased
    /// before the first word goes into it; sectors are never erased otherwise.
    ///
    /// Interrupts are masked for the whole call, since programming stalls
    /// every read from the bank, instruction fetches included.
    ///
    /// The bank is resolved once from `address`: a single call must not cross
    /// from bank 1 into bank 2. Such a call is not detected. The words past
    /// the split are refused by bank 2 (PGSERR is left in its status
    /// register), only bank 1 is checked, and the call returns `Ok`.
    ///
    /// Every sector the range reaches is checked the way [`erase`] checks it
    /// before anything is written.
    ///
    /// Any error leaves the whole target range undefined. Erase and rewrite
    /// all of it; do not rely on the words that did get written.
    ///
    /// [`write_align`]: FlashDevice::write_align
    /// [`erase`]: FlashDevice::erase
    pub fn write(&mut self, address: u32, data: &[u8]) -> Result<(), Error> {
        if let Err(error) = self.check_write(address, data) {
            log_rejected(Operation::Write, &error);
            return Err(error);
        }

        let bank = self.bank_of(address);
        self.unlock();
        self.clear_errors(bank);

        self.regs.disable_interrupts();
        self.regs.write(bank.reg(CR), CR_PG);
        let result = self.program_words(bank, address, data);
        self.regs.clear_bits(bank.reg(CR), CR_PG);
        self.regs.enable_interrupts();

        self.record(Operation::Write, address, data.len() as u32, bank, result.is_ok());
        result
    }

    fn check_write(&self, address: u32, data: &[u8]) -> Result<(), Error> {
        let len = data.len();
        if len == 0 || len % self.write_align() as usize != 0 {
            return Err(Error::LengthNotAligned { len });
        }
        self.check_span(address, len)?;
        if address % WORD_SIZE != 0 {
            return Err(Error::Misaligned { address });
        }

        let end = address + len as u32;
        let offset = address - self.start();
        let mut sector = self.start() + offset.div_ceil(SECTOR_SIZE) * SECTOR_SIZE;
        while sector < end {
            self.resolve_sector(sector)?;
            sector += SECTOR_SIZE;
        }
        Ok(())
    }

    fn program_words(&mut self, bank: Bank, address: u32, data: &[u8]) -> Result<(), Error> {
        let mut dst = address;
        for word in data.chunks_exact(WORD_SIZE as usize) {
            if self.is_sector_start(dst) {
                self.erase(dst)?;
            }
            let value = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
            self.regs.write(dst, value);
            self.complete(bank)?;
            dst += WORD_SIZE;
        }
        Ok(())
    }
}
