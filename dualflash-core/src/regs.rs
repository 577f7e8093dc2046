// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Register file abstraction and the STM32H7 flash controller layout.
//!
//! Every access the engine makes goes through [`RegisterFile`]: control and
//! status registers, the option registers, the geometry register and the flash
//! array itself (a program operation is a plain word store into the array).
//! On target this binds to volatile pointer accesses (see `Mmio`), on the host
//! to the simulated device in `sim`.
//!
//! Offsets and bit positions follow RM0433 section 4.9.

/// Register block of bank 1.
pub const FLASH_BASE1: u32 = 0x5200_2000;
/// Register block of bank 2 (dual-bank devices only).
pub const FLASH_BASE2: u32 = 0x5200_2100;

pub const KEYR: u32 = 0x04;
pub const OPTKEYR: u32 = 0x08;
pub const CR: u32 = 0x0C;
pub const SR: u32 = 0x10;
pub const CCR: u32 = 0x14;
pub const OPTCR: u32 = 0x18;
pub const OPTSR_CUR: u32 = 0x1C;
pub const OPTSR_PRG: u32 = 0x20;

/// Flash capacity in KiB, low halfword.
pub const FLASH_SIZE_REG: u32 = 0x1FF1_E880;

/// Cortex-M application interrupt and reset control register.
pub const SCB_AIRCR: u32 = 0xE000_ED0C;
/// VECTKEY (0x05FA) in the upper halfword plus SYSRESETREQ.
pub const AIRCR_SYSRESET: u32 = 0x05FA_0004;

/// Control register unlock sequence, written to `KEYR` of each bank.
pub const KEY1: u32 = 0x4567_0123;
pub const KEY2: u32 = 0xCDEF_89AB;

/// Option register unlock sequence, written once to the shared `OPTKEYR`.
pub const OPTKEY1: u32 = 0x0819_2A3B;
pub const OPTKEY2: u32 = 0x4C5D_6E7F;

pub const CR_LOCK: u32 = bit(0);
pub const CR_PG: u32 = bit(1);
pub const CR_SER: u32 = bit(2);
pub const CR_START: u32 = bit(7);
pub const CR_SNB: Field = Field::new(8, 3);

pub const SR_BSY: u32 = bit(0);
pub const SR_QW: u32 = bit(2);
pub const SR_BUSY: u32 = SR_BSY | SR_QW;
pub const SR_WRPERR: u32 = bit(17);
pub const SR_PGSERR: u32 = bit(18);
pub const SR_INCERR: u32 = bit(21);
pub const SR_OPERR: u32 = bit(22);
/// Error flags, bits 17..=27 of `SR` and of `CCR`.
pub const SR_ERRORS: Field = Field::new(17, 11);

pub const OPTCR_OPTLOCK: u32 = bit(0);
pub const OPTCR_OPTSTART: u32 = bit(1);
/// SWAP_BANK, in both `OPTSR_CUR` and `OPTSR_PRG`.
pub const OPT_SWAP_BANK: u32 = bit(31);

pub const fn bit(n: u32) -> u32 {
    1 << n
}

/// A contiguous bit field inside a 32-bit register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    shift: u32,
    width: u32,
}

impl Field {
    pub const fn new(shift: u32, width: u32) -> Self {
        Self { shift, width }
    }

    /// In-place mask of the field.
    pub const fn mask(self) -> u32 {
        ((1 << self.width) - 1) << self.shift
    }

    /// Shift `value` into position, dropping bits that do not fit.
    pub const fn encode(self, value: u32) -> u32 {
        (value << self.shift) & self.mask()
    }

    pub const fn decode(self, reg: u32) -> u32 {
        (reg & self.mask()) >> self.shift
    }
}

/// One of the flash controller's per-bank register blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Bank {
    One,
    Two,
}

impl Bank {
    pub const fn base(self) -> u32 {
        match self {
            Bank::One => FLASH_BASE1,
            Bank::Two => FLASH_BASE2,
        }
    }

    /// Absolute address of the register at `offset` in this bank's block.
    pub const fn reg(self, offset: u32) -> u32 {
        self.base() + offset
    }

    pub const fn number(self) -> u8 {
        match self {
            Bank::One => 1,
            Bank::Two => 2,
        }
    }
}

/// Word-wide access to memory-mapped registers and the flash array.
///
/// Methods take `&self`: every access is a volatile side effect on the
/// hardware, and the simulated backend keeps its state behind a `RefCell`.
/// Implementations must not cache values across calls.
pub trait RegisterFile {
    fn read(&self, addr: u32) -> u32;

    fn write(&self, addr: u32, value: u32);

    /// Mask interrupts on the executing core.
    fn disable_interrupts(&self);

    /// Unmask interrupts on the executing core, unconditionally.
    fn enable_interrupts(&self);

    /// Complete outstanding memory accesses before continuing.
    fn barrier(&self) {}

    /// Read-modify-write: clear `clear`, then set `set`.
    fn modify(&self, addr: u32, clear: u32, set: u32) {
        let value = self.read(addr);
        self.write(addr, (value & !clear) | set);
    }

    fn set_bits(&self, addr: u32, bits: u32) {
        self.modify(addr, 0, bits);
    }

    fn clear_bits(&self, addr: u32, bits: u32) {
        self.modify(addr, bits, 0);
    }

    /// Replace a field, leaving the rest of the register untouched.
    fn write_field(&self, addr: u32, field: Field, value: u32) {
        self.modify(addr, field.mask(), field.encode(value));
    }

    fn read_field(&self, addr: u32, field: Field) -> u32 {
        field.decode(self.read(addr))
    }
}

impl<R: RegisterFile + ?Sized> RegisterFile for &R {
    fn read(&self, addr: u32) -> u32 {
        (**self).read(addr)
    }

    fn write(&self, addr: u32, value: u32) {
        (**self).write(addr, value)
    }

    fn disable_interrupts(&self) {
        (**self).disable_interrupts()
    }

    fn enable_interrupts(&self) {
        (**self).enable_interrupts()
    }

    fn barrier(&self) {
        (**self).barrier()
    }
}
