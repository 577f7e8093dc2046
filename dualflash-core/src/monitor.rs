// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Busy and error flag handling.
//!
//! The busy waits have no timeout and cannot be cancelled: a controller that
//! never drops its busy flags hangs the caller.

use crate::device::FlashDevice;
use crate::regs::{Bank, RegisterFile, CCR, CR, SR, SR_BUSY, SR_ERRORS};
use crate::Error;

impl<R: RegisterFile, S> FlashDevice<R, S> {
    /// Wait for the bank to go idle, then clear every error flag.
    pub fn clear_errors(&self, bank: Bank) {
        self.wait_idle(bank);
        self.regs.write(bank.reg(CCR), SR_ERRORS.mask());
    }

    /// Any error flag set in the status register.
    pub fn is_error(&self, bank: Bank) -> bool {
        self.regs.read(bank.reg(SR)) & SR_ERRORS.mask() != 0
    }

    /// Spin until both BSY and QW are clear.
    pub fn wait_idle(&self, bank: Bank) {
        while self.regs.read(bank.reg(SR)) & SR_BUSY != 0 {
            core::hint::spin_loop();
        }
    }

    /// Wait for the operation in flight, then turn its error flags into a result.
    pub(crate) fn complete(&self, bank: Bank) -> Result<(), Error> {
        self.wait_idle(bank);
        if self.is_error(bank) {
            Err(Error::HardwareFault {
                control: self.regs.read(bank.reg(CR)),
                status: self.regs.read(bank.reg(SR)),
            })
        } else {
            Ok(())
        }
    }
}
