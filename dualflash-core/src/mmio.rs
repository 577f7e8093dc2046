// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Memory-mapped register backend for the real device.
//!
//! The engine code that drives these accesses should be linked into RAM
//! (e.g. the `.data` section) on single-bank parts: an erase or program
//! stalls instruction fetches from the bank being modified.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::regs::RegisterFile;

static TAKEN: AtomicBool = AtomicBool::new(false);

/// Volatile access to the flash controller, the option registers and the
/// flash array at their physical addresses.
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /// Hand out the register backend. Returns `None` after the first call.
    pub fn take() -> Option<Self> {
        if TAKEN.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(Self { _private: () })
        }
    }
}

impl RegisterFile for Mmio {
    #[inline(always)]
    fn read(&self, addr: u32) -> u32 {
        unsafe { (addr as *const u32).read_volatile() }
    }

    #[inline(always)]
    fn write(&self, addr: u32, value: u32) {
        unsafe { (addr as *mut u32).write_volatile(value) }
    }

    fn disable_interrupts(&self) {
        cortex_m::interrupt::disable();
    }

    fn enable_interrupts(&self) {
        // SAFETY: the engine only unmasks after its own critical section.
        unsafe { cortex_m::interrupt::enable() };
    }

    fn barrier(&self) {
        cortex_m::asm::dsb();
        cortex_m::asm::isb();
    }
}
