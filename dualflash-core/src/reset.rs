// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

use crate::device::FlashDevice;
use crate::regs::{RegisterFile, AIRCR_SYSRESET, SCB_AIRCR};

impl<R: RegisterFile, S> FlashDevice<R, S> {
    /// Request a system reset through SCB AIRCR.
    ///
    /// Does not return on hardware. Every write and any bank swap must have
    /// completed before this is called.
    pub fn reset(&mut self) {
        #[cfg(feature = "defmt")]
        defmt::println!("Resetting device");
        self.regs.barrier();
        self.regs.write(SCB_AIRCR, AIRCR_SYSRESET);
        self.regs.barrier();
    }
}
