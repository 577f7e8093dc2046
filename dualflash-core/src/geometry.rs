// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Device layout: where the flash array lives, how big it is and how it is
//! divided. All queries are side-effect free.

use core::ops::Range;

use crate::device::FlashDevice;
use crate::regs::{Bank, RegisterFile, FLASH_SIZE_REG, OPTSR_CUR, OPT_SWAP_BANK};

/// Base of the flash array in the AXI address map.
pub const FLASH_START: u32 = 0x0800_0000;
/// Smallest erasable unit.
pub const SECTOR_SIZE: u32 = 128 * 1024;
/// Flash word: 256 bits.
pub const WRITE_ALIGN: u32 = 32;
/// Granularity of a single store into the array.
pub const WORD_SIZE: u32 = 4;

/// Static description of the target part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceConfig {
    pub flash_start: u32,
    pub dual_bank: bool,
    /// Single-bank parts only: on the first boot after factory programming,
    /// the flash is taken as already unlocked and no key is written.
    pub first_boot_skips_unlock: bool,
}

impl DeviceConfig {
    pub const SINGLE_BANK: Self = Self {
        flash_start: FLASH_START,
        dual_bank: false,
        first_boot_skips_unlock: true,
    };

    pub const DUAL_BANK: Self = Self {
        flash_start: FLASH_START,
        dual_bank: true,
        first_boot_skips_unlock: true,
    };

    /// Profile selected by the `dual-bank` cargo feature.
    #[cfg(feature = "dual-bank")]
    pub const TARGET: Self = Self::DUAL_BANK;
    #[cfg(not(feature = "dual-bank"))]
    pub const TARGET: Self = Self::SINGLE_BANK;

    pub const fn with_first_boot_skips_unlock(mut self, skip: bool) -> Self {
        self.first_boot_skips_unlock = skip;
        self
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::TARGET
    }
}

impl<R: RegisterFile, S> FlashDevice<R, S> {
    pub fn start(&self) -> u32 {
        self.config.flash_start
    }

    /// Capacity in bytes, read from the geometry register on every call.
    pub fn size(&self) -> u32 {
        (self.regs.read(FLASH_SIZE_REG) & 0xFFFF) * 1024
    }

    pub fn sector_size(&self) -> u32 {
        SECTOR_SIZE
    }

    pub fn write_align(&self) -> u32 {
        WRITE_ALIGN
    }

    pub fn is_dual_bank(&self) -> bool {
        self.config.dual_bank
    }

    /// Bank currently mapped at the flash base.
    pub fn active_bank(&self) -> Bank {
        if !self.config.dual_bank {
            return Bank::One;
        }
        if self.regs.read(Bank::One.reg(OPTSR_CUR)) & OPT_SWAP_BANK != 0 {
            Bank::Two
        } else {
            Bank::One
        }
    }

    pub fn sector_count(&self) -> u32 {
        self.size() / SECTOR_SIZE
    }

    pub fn sectors_per_bank(&self) -> u32 {
        if self.config.dual_bank {
            (self.size() / 2) / SECTOR_SIZE
        } else {
            self.sector_count()
        }
    }

    pub fn range(&self) -> Range<u32> {
        let start = self.start();
        start..start + self.size()
    }

    pub fn contains(&self, address: u32) -> bool {
        self.range().contains(&address)
    }

    /// `true` if `address` is inside the array and starts a sector.
    pub fn is_sector_start(&self, address: u32) -> bool {
        self.contains(address) && (address - self.start()) % SECTOR_SIZE == 0
    }

    /// Region an update image should be staged into: the upper half on
    /// dual-bank parts. Single-bank parts have no fixed inactive region.
    pub fn inactive_region(&self) -> Option<Range<u32>> {
        if !self.config.dual_bank {
            return None;
        }
        let range = self.range();
        Some(range.start + self.size() / 2..range.end)
    }
}
