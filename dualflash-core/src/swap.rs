// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Bank swap through the option bytes.
//!
//! SWAP_BANK is written to the program register `OPTSR_PRG`, committed with
//! OPTSTART, and shows up in `OPTSR_CUR` once the controller has finished.
//! The bootloader maps the other bank at the flash base on the next reset.

use crate::device::FlashDevice;
use crate::event::Operation;
use crate::ota::OtaStatus;
use crate::regs::{Bank, RegisterFile, OPTCR, OPTCR_OPTSTART, OPTSR_CUR, OPTSR_PRG, OPT_SWAP_BANK};
use crate::Error;

impl<R: RegisterFile, S: OtaStatus> FlashDevice<R, S> {
    /// Flip the bank mapped at the flash base after the next reset.
    ///
    /// No-op returning `Ok` on single-bank parts. Spins without a timeout
    /// until the commit is visible in `OPTSR_CUR`. Only call this once the
    /// staged image has been verified, and only reset after it returns.
    pub fn swap_bank(&mut self) -> Result<(), Error> {
        if !self.config.dual_bank {
            return Ok(());
        }

        let bank = Bank::One;
        self.unlock();
        self.clear_errors(bank);

        let current = self.regs.read(bank.reg(OPTSR_CUR)) & OPT_SWAP_BANK;
        let desired = current ^ OPT_SWAP_BANK;
        self.regs.modify(bank.reg(OPTSR_PRG), OPT_SWAP_BANK, desired);
        self.regs.set_bits(bank.reg(OPTCR), OPTCR_OPTSTART);

        while self.regs.read(bank.reg(OPTSR_CUR)) & OPT_SWAP_BANK != desired {
            core::hint::spin_loop();
        }

        self.record(Operation::SwapBank, self.start(), 0, bank, true);
        Ok(())
    }
}
