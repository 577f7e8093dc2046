// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! In-memory model of the flash controller and array.
//!
//! Implements [`RegisterFile`] so the engine runs unchanged on the host.
//! The model keeps the behaviors the engine depends on:
//! - `LOCK`/`OPTLOCK` cleared only by the right key sequence
//! - sector erase latched by `START` with `SER` and `SNB`
//! - NOR programming (bits only go from 1 to 0) gated by `PG`, refused
//!   while `SER` is still set
//! - busy flags that stay up for a number of status polls
//! - error flags cleared through `CCR`
//! - option commit that reaches `OPTSR_CUR` a number of polls after `OPTSTART`
//! - system reset through AIRCR, which re-locks everything
//!
//! Every register write is logged for inspection.

use std::cell::RefCell;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geometry::{DeviceConfig, FLASH_START, SECTOR_SIZE};
use crate::regs::{
    Bank, RegisterFile, AIRCR_SYSRESET, CCR, CR, CR_LOCK, CR_PG, CR_SER, CR_SNB, CR_START,
    FLASH_BASE1, FLASH_BASE2, FLASH_SIZE_REG, KEY1, KEY2, KEYR, OPTCR, OPTCR_OPTLOCK,
    OPTCR_OPTSTART, OPTKEY1, OPTKEY2, OPTKEYR, OPTSR_CUR, OPTSR_PRG, OPT_SWAP_BANK, SCB_AIRCR,
    SR, SR_BUSY, SR_ERRORS, SR_INCERR, SR_OPERR, SR_PGSERR, SR_WRPERR,
};

const BLOCK_SIZE: u32 = 0x100;

/// Persistent content of a simulated device: what survives a power cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimImage {
    pub size_kib: u32,
    pub dual_bank: bool,
    pub swapped: bool,
    pub resets: u32,
    pub array: Vec<u8>,
}

pub struct SimulatedFlashBuilder {
    size_kib: u32,
    dual_bank: bool,
    fill: u8,
    busy_polls: u32,
    commit_polls: u32,
    unlocked_at_boot: bool,
    swapped: bool,
    fail_erase_at: Option<u32>,
    fail_program_at: Option<u32>,
}

impl SimulatedFlashBuilder {
    pub fn new(size_kib: u32) -> Self {
        Self {
            size_kib,
            dual_bank: true,
            fill: 0xFF,
            busy_polls: 2,
            commit_polls: 3,
            unlocked_at_boot: false,
            swapped: false,
            fail_erase_at: None,
            fail_program_at: None,
        }
    }

    pub fn dual_bank(mut self, dual_bank: bool) -> Self {
        self.dual_bank = dual_bank;
        self
    }

    /// Initial content of every byte of the array.
    pub fn fill(mut self, fill: u8) -> Self {
        self.fill = fill;
        self
    }

    /// Status polls that report busy after each erase or program.
    pub fn busy_polls(mut self, polls: u32) -> Self {
        self.busy_polls = polls;
        self
    }

    /// `OPTSR_CUR` polls before an option commit becomes visible.
    pub fn commit_polls(mut self, polls: u32) -> Self {
        self.commit_polls = polls;
        self
    }

    /// Come out of reset with the control and option registers unlocked, as
    /// a debug probe leaves them after programming.
    pub fn unlocked_at_boot(mut self) -> Self {
        self.unlocked_at_boot = true;
        self
    }

    pub fn swapped(mut self, swapped: bool) -> Self {
        self.swapped = swapped;
        self
    }

    /// Erase of the sector starting at `address` reports OPERR and leaves
    /// the sector untouched.
    pub fn fail_erase_at(mut self, address: u32) -> Self {
        self.fail_erase_at = Some(address);
        self
    }

    /// Program of the word at `address` reports OPERR and leaves it untouched.
    pub fn fail_program_at(mut self, address: u32) -> Self {
        self.fail_program_at = Some(address);
        self
    }

    pub fn build(&self) -> SimulatedFlash {
        let size = self.size_kib as usize * 1024;
        let swap = if self.swapped { OPT_SWAP_BANK } else { 0 };
        let (cr, optlock) = if self.unlocked_at_boot {
            (0, 0)
        } else {
            (CR_LOCK, OPTCR_OPTLOCK)
        };

        SimulatedFlash {
            size_kib: self.size_kib,
            dual_bank: self.dual_bank,
            busy_polls: self.busy_polls,
            commit_polls: self.commit_polls,
            state: RefCell::new(SimState {
                array: vec![self.fill; size],
                banks: [Controller::new(cr), Controller::new(cr)],
                optcr: optlock | swap,
                optsr_cur: swap,
                optsr_prg: swap,
                opt_key_stage: 0,
                pending_commit: None,
                other: BTreeMap::new(),
                irq_masked: false,
                fail_erase_at: self.fail_erase_at,
                fail_program_at: self.fail_program_at,
                writes: Vec::new(),
                erased: Vec::new(),
                unmasked_stores: 0,
                masked_erases: 0,
                option_key_misuse: false,
                resets: 0,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Controller {
    cr: u32,
    sr: u32,
    key_stage: u8,
    busy: u32,
}

impl Controller {
    fn new(cr: u32) -> Self {
        Self {
            cr,
            sr: 0,
            key_stage: 0,
            busy: 0,
        }
    }
}

struct SimState {
    array: Vec<u8>,
    banks: [Controller; 2],
    optcr: u32,
    optsr_cur: u32,
    optsr_prg: u32,
    opt_key_stage: u8,
    pending_commit: Option<u32>,
    other: BTreeMap<u32, u32>,
    irq_masked: bool,
    fail_erase_at: Option<u32>,
    fail_program_at: Option<u32>,
    writes: Vec<(u32, u32)>,
    erased: Vec<u32>,
    unmasked_stores: usize,
    masked_erases: usize,
    option_key_misuse: bool,
    resets: u32,
}

/// Where an address lands in the simulated memory map.
enum Target {
    Array(usize),
    Bank(usize, u32),
    Geometry,
    Aircr,
    Other,
}

/// Simulated flash device. See the module documentation.
pub struct SimulatedFlash {
    size_kib: u32,
    dual_bank: bool,
    busy_polls: u32,
    commit_polls: u32,
    state: RefCell<SimState>,
}

impl SimulatedFlash {
    pub fn builder(size_kib: u32) -> SimulatedFlashBuilder {
        SimulatedFlashBuilder::new(size_kib)
    }

    /// Power up a device from a saved image.
    pub fn from_image(image: SimImage) -> Self {
        let sim = Self::builder(image.size_kib)
            .dual_bank(image.dual_bank)
            .swapped(image.swapped)
            .build();
        {
            let mut st = sim.state.borrow_mut();
            st.resets = image.resets;
            let len = st.array.len().min(image.array.len());
            st.array[..len].copy_from_slice(&image.array[..len]);
        }
        sim
    }

    /// Capture the non-volatile state: array content and committed option bytes.
    pub fn image(&self) -> SimImage {
        let st = self.state.borrow();
        SimImage {
            size_kib: self.size_kib,
            dual_bank: self.dual_bank,
            swapped: st.optsr_cur & OPT_SWAP_BANK != 0,
            resets: st.resets,
            array: st.array.clone(),
        }
    }

    /// Engine configuration matching this device.
    pub fn device_config(&self) -> DeviceConfig {
        if self.dual_bank {
            DeviceConfig::DUAL_BANK
        } else {
            DeviceConfig::SINGLE_BANK
        }
    }

    pub fn size(&self) -> u32 {
        self.size_kib * 1024
    }

    /// Raw array content, without going through the register interface.
    pub fn bytes(&self, address: u32, len: usize) -> Vec<u8> {
        let st = self.state.borrow();
        let offset = (address - FLASH_START) as usize;
        st.array[offset..offset + len].to_vec()
    }

    /// Overwrite array content directly, as a debug probe would.
    pub fn load(&self, address: u32, data: &[u8]) {
        let mut st = self.state.borrow_mut();
        let offset = (address - FLASH_START) as usize;
        st.array[offset..offset + data.len()].copy_from_slice(data);
    }

    /// Every register and array write, in order.
    pub fn writes(&self) -> Vec<(u32, u32)> {
        self.state.borrow().writes.clone()
    }

    pub fn write_count(&self) -> usize {
        self.state.borrow().writes.len()
    }

    /// Writes to one address.
    pub fn writes_to(&self, addr: u32) -> usize {
        self.state
            .borrow()
            .writes
            .iter()
            .filter(|(a, _)| *a == addr)
            .count()
    }

    /// Start addresses of the sectors erased so far, in order.
    pub fn erased_sectors(&self) -> Vec<u32> {
        self.state.borrow().erased.clone()
    }

    /// Drop the write and erase logs.
    pub fn clear_log(&self) {
        let mut st = self.state.borrow_mut();
        st.writes.clear();
        st.erased.clear();
        st.unmasked_stores = 0;
        st.masked_erases = 0;
    }

    /// Array stores performed while interrupts were enabled.
    pub fn unmasked_stores(&self) -> usize {
        self.state.borrow().unmasked_stores
    }

    /// Erases started while interrupts were masked.
    pub fn masked_erases(&self) -> usize {
        self.state.borrow().masked_erases
    }

    pub fn interrupts_masked(&self) -> bool {
        self.state.borrow().irq_masked
    }

    /// Whether the option key register was written again after it had
    /// been unlocked. Real hardware would lock it until the next reset.
    pub fn option_key_misuse(&self) -> bool {
        self.state.borrow().option_key_misuse
    }

    pub fn reset_count(&self) -> u32 {
        self.state.borrow().resets
    }

    /// `CR` of a bank, read without side effects.
    pub fn control(&self, bank: Bank) -> u32 {
        self.state.borrow().banks[bank_index(bank)].cr
    }

    /// `SR` of a bank without busy flags, read without side effects.
    pub fn status(&self, bank: Bank) -> u32 {
        self.state.borrow().banks[bank_index(bank)].sr
    }

    /// Set status flags, e.g. to leave a stale error behind.
    pub fn raise_status(&self, bank: Bank, bits: u32) {
        self.state.borrow_mut().banks[bank_index(bank)].sr |= bits;
    }

    pub fn is_swapped(&self) -> bool {
        self.state.borrow().optsr_cur & OPT_SWAP_BANK != 0
    }

    /// `OPTSR_PRG`, read without side effects.
    pub fn option_program(&self) -> u32 {
        self.state.borrow().optsr_prg
    }

    pub fn is_locked(&self, bank: Bank) -> bool {
        self.control(bank) & CR_LOCK != 0
    }

    pub fn is_option_locked(&self) -> bool {
        self.state.borrow().optcr & OPTCR_OPTLOCK != 0
    }

    fn target(&self, addr: u32) -> Target {
        let size = self.size();
        if addr >= FLASH_START && addr - FLASH_START < size {
            return Target::Array((addr - FLASH_START) as usize);
        }
        if (FLASH_BASE1..FLASH_BASE1 + BLOCK_SIZE).contains(&addr) {
            return Target::Bank(0, addr - FLASH_BASE1);
        }
        if self.dual_bank && (FLASH_BASE2..FLASH_BASE2 + BLOCK_SIZE).contains(&addr) {
            return Target::Bank(1, addr - FLASH_BASE2);
        }
        match addr {
            FLASH_SIZE_REG => Target::Geometry,
            SCB_AIRCR => Target::Aircr,
            _ => Target::Other,
        }
    }

    fn array_bank(&self, offset: usize) -> usize {
        if self.dual_bank && offset >= self.size() as usize / 2 {
            1
        } else {
            0
        }
    }

    fn read_bank(&self, st: &mut SimState, idx: usize, offset: u32) -> u32 {
        match offset {
            CR => st.banks[idx].cr,
            SR => {
                let ctrl = &mut st.banks[idx];
                if ctrl.busy > 0 {
                    ctrl.busy -= 1;
                    ctrl.sr | SR_BUSY
                } else {
                    ctrl.sr
                }
            }
            OPTCR => (st.optcr & !OPT_SWAP_BANK) | (st.optsr_cur & OPT_SWAP_BANK),
            OPTSR_CUR => {
                if let Some(polls) = st.pending_commit {
                    if polls == 0 {
                        st.optsr_cur = (st.optsr_cur & !OPT_SWAP_BANK) | (st.optsr_prg & OPT_SWAP_BANK);
                        st.pending_commit = None;
                    } else {
                        st.pending_commit = Some(polls - 1);
                    }
                }
                st.optsr_cur
            }
            OPTSR_PRG => st.optsr_prg,
            _ => 0,
        }
    }

    fn write_bank(&self, st: &mut SimState, idx: usize, offset: u32, value: u32) {
        match offset {
            KEYR => {
                let ctrl = &mut st.banks[idx];
                match (ctrl.key_stage, value) {
                    (0, KEY1) => ctrl.key_stage = 1,
                    (1, KEY2) => {
                        ctrl.key_stage = 0;
                        ctrl.cr &= !CR_LOCK;
                    }
                    _ => ctrl.key_stage = 0,
                }
            }
            OPTKEYR => {
                if st.optcr & OPTCR_OPTLOCK == 0 {
                    st.option_key_misuse = true;
                    return;
                }
                match (st.opt_key_stage, value) {
                    (0, OPTKEY1) => st.opt_key_stage = 1,
                    (1, OPTKEY2) => {
                        st.opt_key_stage = 0;
                        st.optcr &= !OPTCR_OPTLOCK;
                    }
                    _ => st.opt_key_stage = 0,
                }
            }
            CR => {
                if st.banks[idx].cr & CR_LOCK != 0 {
                    return;
                }
                st.banks[idx].cr = value & !CR_START;
                if value & CR_START != 0 && value & CR_SER != 0 {
                    self.erase_sector(st, idx, CR_SNB.decode(value));
                }
            }
            CCR => st.banks[idx].sr &= !(value & SR_ERRORS.mask()),
            OPTCR => {
                if st.optcr & OPTCR_OPTLOCK != 0 {
                    return;
                }
                st.optcr = value & !(OPTCR_OPTSTART | OPT_SWAP_BANK);
                if value & OPTCR_OPTSTART != 0 {
                    st.pending_commit = Some(self.commit_polls);
                }
            }
            OPTSR_PRG => {
                if st.optcr & OPTCR_OPTLOCK == 0 {
                    st.optsr_prg = value;
                }
            }
            _ => {}
        }
    }

    fn erase_sector(&self, st: &mut SimState, idx: usize, local: u32) {
        let sectors = self.size() / SECTOR_SIZE;
        let global = if self.dual_bank {
            idx as u32 * (sectors / 2) + local
        } else {
            local
        };
        if st.irq_masked {
            st.masked_erases += 1;
        }
        st.banks[idx].busy = self.busy_polls;

        let address = FLASH_START + global * SECTOR_SIZE;
        if global >= sectors || st.fail_erase_at == Some(address) {
            st.banks[idx].sr |= SR_OPERR;
            return;
        }
        let offset = (global * SECTOR_SIZE) as usize;
        st.array[offset..offset + SECTOR_SIZE as usize].fill(0xFF);
        st.erased.push(address);
    }

    fn program_word(&self, st: &mut SimState, offset: usize, value: u32) {
        if !st.irq_masked {
            st.unmasked_stores += 1;
        }
        let idx = self.array_bank(offset);
        let ctrl = &mut st.banks[idx];
        ctrl.busy = self.busy_polls;
        if ctrl.cr & CR_LOCK != 0 {
            ctrl.sr |= SR_WRPERR;
            return;
        }
        if ctrl.cr & CR_PG == 0 {
            ctrl.sr |= SR_PGSERR;
            return;
        }
        if ctrl.cr & CR_SER != 0 {
            ctrl.sr |= SR_INCERR;
            return;
        }
        if st.fail_program_at == Some(FLASH_START + offset as u32) {
            ctrl.sr |= SR_OPERR;
            return;
        }
        let end = (offset + 4).min(st.array.len());
        for (cell, byte) in st.array[offset..end].iter_mut().zip(value.to_le_bytes()) {
            *cell &= byte;
        }
    }

    fn system_reset(&self, st: &mut SimState) {
        if st.pending_commit.take().is_some() {
            st.optsr_cur = (st.optsr_cur & !OPT_SWAP_BANK) | (st.optsr_prg & OPT_SWAP_BANK);
        }
        for ctrl in st.banks.iter_mut() {
            *ctrl = Controller::new(CR_LOCK);
        }
        st.optcr = OPTCR_OPTLOCK;
        st.optsr_prg = st.optsr_cur;
        st.opt_key_stage = 0;
        st.irq_masked = false;
        st.option_key_misuse = false;
        st.resets += 1;
    }
}

impl RegisterFile for SimulatedFlash {
    fn read(&self, addr: u32) -> u32 {
        let mut st = self.state.borrow_mut();
        match self.target(addr) {
            Target::Array(offset) => {
                let mut bytes = [0xFF; 4];
                for (i, byte) in bytes.iter_mut().enumerate() {
                    if let Some(b) = st.array.get(offset + i) {
                        *byte = *b;
                    }
                }
                u32::from_le_bytes(bytes)
            }
            Target::Bank(idx, offset) => self.read_bank(&mut st, idx, offset),
            Target::Geometry => self.size_kib,
            Target::Aircr => 0,
            Target::Other => st.other.get(&addr).copied().unwrap_or(0),
        }
    }

    fn write(&self, addr: u32, value: u32) {
        let mut st = self.state.borrow_mut();
        st.writes.push((addr, value));
        match self.target(addr) {
            Target::Array(offset) => self.program_word(&mut st, offset, value),
            Target::Bank(idx, offset) => self.write_bank(&mut st, idx, offset, value),
            Target::Geometry => {}
            Target::Aircr => {
                if value == AIRCR_SYSRESET {
                    self.system_reset(&mut st);
                }
            }
            Target::Other => {
                st.other.insert(addr, value);
            }
        }
    }

    fn disable_interrupts(&self) {
        self.state.borrow_mut().irq_masked = true;
    }

    fn enable_interrupts(&self) {
        self.state.borrow_mut().irq_masked = false;
    }
}

fn bank_index(bank: Bank) -> usize {
    match bank {
        Bank::One => 0,
        Bank::Two => 1,
    }
}
