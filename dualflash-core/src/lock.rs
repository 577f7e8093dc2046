// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! One-time unlock of the control and option registers.
//!
//! The option key register is shared between banks and must be written only
//! once per reset: a second key sequence locks it until the next reset. There
//! is no re-lock operation.

use crate::device::FlashDevice;
use crate::ota::{OtaState, OtaStatus};
use crate::regs::{Bank, RegisterFile, KEY1, KEY2, KEYR, OPTKEY1, OPTKEY2, OPTKEYR};

impl<R: RegisterFile, S: OtaStatus> FlashDevice<R, S> {
    /// Write the unlock keys if this has not happened yet. Idempotent.
    pub fn unlock(&mut self) {
        if self.unlocked {
            return;
        }

        if !self.config.dual_bank
            && self.config.first_boot_skips_unlock
            && self.status.firmware_status() == OtaState::FirstBoot
        {
            #[cfg(feature = "defmt")]
            defmt::debug!("First boot, flash left unlocked by the programmer");
            self.unlocked = true;
            return;
        }

        self.write_keys(Bank::One);
        if self.config.dual_bank {
            self.write_keys(Bank::Two);
        }

        let optkeyr = Bank::One.reg(OPTKEYR);
        self.regs.write(optkeyr, OPTKEY1);
        self.regs.write(optkeyr, OPTKEY2);

        self.unlocked = true;
    }

    fn write_keys(&self, bank: Bank) {
        let keyr = bank.reg(KEYR);
        self.regs.write(keyr, KEY1);
        self.regs.write(keyr, KEY2);
    }
}
