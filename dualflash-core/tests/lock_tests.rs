// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Unlock key sequences and the first-boot policy.

use dualflash_core::regs::{KEY1, KEY2, KEYR, OPTKEY1, OPTKEY2, OPTKEYR};
use dualflash_core::sim::SimulatedFlash;
use dualflash_core::{Bank, DeviceConfig, FlashDevice, OtaState, FLASH_START, SECTOR_SIZE};

#[test]
fn test_unlock_writes_keys_once() {
    let sim = SimulatedFlash::builder(2048).build();
    let mut flash = FlashDevice::new(&sim, DeviceConfig::DUAL_BANK, OtaState::Other);

    flash.unlock();
    flash.unlock();

    assert!(flash.is_unlocked());
    assert_eq!(sim.writes_to(Bank::One.reg(KEYR)), 2);
    assert_eq!(sim.writes_to(Bank::Two.reg(KEYR)), 2);
    assert_eq!(sim.writes_to(Bank::One.reg(OPTKEYR)), 2);
    assert_eq!(sim.write_count(), 6);
}

#[test]
fn test_unlock_key_order() {
    let sim = SimulatedFlash::builder(2048).build();
    let mut flash = FlashDevice::new(&sim, DeviceConfig::DUAL_BANK, OtaState::Other);

    flash.unlock();

    assert_eq!(
        sim.writes(),
        vec![
            (Bank::One.reg(KEYR), KEY1),
            (Bank::One.reg(KEYR), KEY2),
            (Bank::Two.reg(KEYR), KEY1),
            (Bank::Two.reg(KEYR), KEY2),
            (Bank::One.reg(OPTKEYR), OPTKEY1),
            (Bank::One.reg(OPTKEYR), OPTKEY2),
        ]
    );
    assert!(!sim.is_locked(Bank::One));
    assert!(!sim.is_locked(Bank::Two));
    assert!(!sim.is_option_locked());
}

#[test]
fn test_single_bank_unlock_skips_bank_two() {
    let sim = SimulatedFlash::builder(1024).dual_bank(false).build();
    let mut flash = FlashDevice::new(&sim, DeviceConfig::SINGLE_BANK, OtaState::Other);

    flash.unlock();

    assert_eq!(sim.writes_to(Bank::One.reg(KEYR)), 2);
    assert_eq!(sim.writes_to(Bank::Two.reg(KEYR)), 0);
    assert_eq!(sim.writes_to(Bank::One.reg(OPTKEYR)), 2);
}

#[test]
fn test_option_keys_never_rewritten() {
    let sim = SimulatedFlash::builder(2048).fill(0x00).build();
    let mut flash = FlashDevice::new(&sim, DeviceConfig::DUAL_BANK, OtaState::Other);

    flash.erase(FLASH_START).unwrap();
    flash.write(FLASH_START, &[0x11; 64]).unwrap();
    flash.swap_bank().unwrap();
    flash.erase(FLASH_START + SECTOR_SIZE * 8).unwrap();
    flash.swap_bank().unwrap();

    assert_eq!(sim.writes_to(Bank::One.reg(OPTKEYR)), 2);
    assert!(!sim.option_key_misuse());
}

#[test]
fn test_first_boot_single_bank_skips_keys() {
    let sim = SimulatedFlash::builder(1024)
        .dual_bank(false)
        .unlocked_at_boot()
        .build();
    let mut flash = FlashDevice::new(&sim, DeviceConfig::SINGLE_BANK, OtaState::FirstBoot);

    flash.unlock();

    assert!(flash.is_unlocked());
    assert_eq!(sim.write_count(), 0);
}

#[test]
fn test_first_boot_policy_can_be_disabled() {
    let sim = SimulatedFlash::builder(1024).dual_bank(false).build();
    let config = DeviceConfig::SINGLE_BANK.with_first_boot_skips_unlock(false);
    let mut flash = FlashDevice::new(&sim, config, OtaState::FirstBoot);

    flash.unlock();

    assert_eq!(sim.writes_to(Bank::One.reg(KEYR)), 2);
    assert_eq!(sim.writes_to(Bank::One.reg(OPTKEYR)), 2);
}

#[test]
fn test_first_boot_ignored_on_dual_bank() {
    let sim = SimulatedFlash::builder(2048).build();
    let mut flash = FlashDevice::new(&sim, DeviceConfig::DUAL_BANK, OtaState::FirstBoot);

    flash.unlock();

    assert_eq!(sim.writes_to(Bank::One.reg(KEYR)), 2);
    assert_eq!(sim.writes_to(Bank::Two.reg(KEYR)), 2);
}

#[test]
fn test_status_provider_closure() {
    let sim = SimulatedFlash::builder(1024).dual_bank(false).build();
    let mut flash = FlashDevice::new(&sim, DeviceConfig::SINGLE_BANK, || OtaState::Other);

    flash.unlock();

    assert_eq!(sim.writes_to(Bank::One.reg(KEYR)), 2);
}

#[test]
fn test_first_boot_erase_on_unlocked_device() {
    let sim = SimulatedFlash::builder(1024)
        .dual_bank(false)
        .unlocked_at_boot()
        .fill(0x00)
        .build();
    let mut flash = FlashDevice::new(&sim, DeviceConfig::SINGLE_BANK, OtaState::FirstBoot);

    flash.erase(FLASH_START + SECTOR_SIZE).unwrap();

    assert_eq!(sim.writes_to(Bank::One.reg(KEYR)), 0);
    assert!(sim
        .bytes(FLASH_START + SECTOR_SIZE, SECTOR_SIZE as usize)
        .iter()
        .all(|&b| b == 0xFF));
}
