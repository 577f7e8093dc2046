// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Sector erase against the simulated controller.

use dualflash_core::regs::{CR, CR_SER, CR_SNB, SR_ERRORS, SR_OPERR, SR_PGSERR};
use dualflash_core::sim::SimulatedFlash;
use dualflash_core::{
    Bank, DeviceConfig, Error, FlashDevice, Operation, OtaState, FLASH_START, SECTOR_SIZE,
};

fn all_bytes(sim: &SimulatedFlash, address: u32, value: u8) -> bool {
    sim.bytes(address, SECTOR_SIZE as usize)
        .iter()
        .all(|&b| b == value)
}

#[test]
fn test_erase_unaligned_address_is_rejected() {
    let sim = SimulatedFlash::builder(2048).build();
    let mut flash = FlashDevice::new(&sim, DeviceConfig::DUAL_BANK, OtaState::Other);

    for address in [FLASH_START + 4, FLASH_START + SECTOR_SIZE - 32, FLASH_START + 1] {
        let err = flash.erase(address).unwrap_err();
        assert_eq!(err, Error::Misaligned { address });
        assert!(err.is_alignment());
    }

    assert_eq!(sim.write_count(), 0);
    assert!(!flash.is_unlocked());
}

#[test]
fn test_erase_out_of_range_is_rejected() {
    let sim = SimulatedFlash::builder(2048).build();
    let mut flash = FlashDevice::new(&sim, DeviceConfig::DUAL_BANK, OtaState::Other);

    let end = FLASH_START + flash.size();
    assert_eq!(flash.erase(end), Err(Error::OutOfRange { address: end }));
    assert_eq!(
        flash.erase(FLASH_START - SECTOR_SIZE),
        Err(Error::OutOfRange {
            address: FLASH_START - SECTOR_SIZE
        })
    );
    assert_eq!(sim.write_count(), 0);
}

#[test]
fn test_erase_second_sector_of_2mb_device() {
    let sim = SimulatedFlash::builder(2048).fill(0x00).build();
    let mut flash = FlashDevice::new(&sim, DeviceConfig::DUAL_BANK, OtaState::Other);

    assert_eq!(flash.size(), 2_097_152);
    assert_eq!(flash.sector_size(), 131_072);
    assert_eq!(flash.write_align(), 32);

    flash.erase(FLASH_START + 131_072).unwrap();

    assert!(all_bytes(&sim, FLASH_START, 0x00));
    assert!(all_bytes(&sim, FLASH_START + SECTOR_SIZE, 0xFF));
    assert!(all_bytes(&sim, FLASH_START + SECTOR_SIZE * 2, 0x00));
    assert!(all_bytes(&sim, FLASH_START + SECTOR_SIZE * 8, 0x00));
    assert_eq!(sim.erased_sectors(), vec![FLASH_START + SECTOR_SIZE]);
}

#[test]
fn test_erase_reads_back_all_ones() {
    let sim = SimulatedFlash::builder(1024).dual_bank(false).fill(0x3C).build();
    let mut flash = FlashDevice::new(&sim, DeviceConfig::SINGLE_BANK, OtaState::Other);

    flash.erase(FLASH_START + SECTOR_SIZE * 3).unwrap();

    let mut buf = vec![0u8; SECTOR_SIZE as usize];
    flash.read(FLASH_START + SECTOR_SIZE * 3, &mut buf).unwrap();
    assert!(buf.iter().all(|&b| b == 0xFF));
}

#[test]
fn test_erase_bank_two_uses_local_index() {
    let sim = SimulatedFlash::builder(2048).fill(0x00).build();
    let mut flash = FlashDevice::new(&sim, DeviceConfig::DUAL_BANK, OtaState::Other);

    flash.erase(FLASH_START + SECTOR_SIZE * 10).unwrap();

    assert_eq!(CR_SNB.decode(sim.control(Bank::Two)), 2);
    assert_eq!(sim.control(Bank::Two) & CR_SER, 0);
    assert!(all_bytes(&sim, FLASH_START + SECTOR_SIZE * 10, 0xFF));
    assert!(all_bytes(&sim, FLASH_START + SECTOR_SIZE * 2, 0x00));
    assert_eq!(sim.writes_to(Bank::One.reg(CR)), 0);
}

#[test]
fn test_sector_select_is_replaced_between_erases() {
    let sim = SimulatedFlash::builder(2048).fill(0x00).build();
    let mut flash = FlashDevice::new(&sim, DeviceConfig::DUAL_BANK, OtaState::Other);

    flash.erase(FLASH_START + SECTOR_SIZE * 3).unwrap();
    assert_eq!(CR_SNB.decode(sim.control(Bank::One)), 3);

    flash.erase(FLASH_START + SECTOR_SIZE * 4).unwrap();
    assert_eq!(CR_SNB.decode(sim.control(Bank::One)), 4);

    assert_eq!(
        sim.erased_sectors(),
        vec![FLASH_START + SECTOR_SIZE * 3, FLASH_START + SECTOR_SIZE * 4]
    );
    assert!(all_bytes(&sim, FLASH_START + SECTOR_SIZE * 7, 0x00));
}

#[test]
fn test_sector_beyond_select_field_is_rejected() {
    let sim = SimulatedFlash::builder(2048).dual_bank(false).build();
    let mut flash = FlashDevice::new(&sim, DeviceConfig::SINGLE_BANK, OtaState::Other);

    let address = FLASH_START + SECTOR_SIZE * 8;
    assert_eq!(flash.erase(address), Err(Error::OutOfRange { address }));
    assert_eq!(sim.write_count(), 0);
}

#[test]
fn test_sector_across_bank_split_is_rejected() {
    // 3 sectors: the half-size split falls inside sector 1
    let sim = SimulatedFlash::builder(384).fill(0x00).build();
    let mut flash = FlashDevice::new(&sim, DeviceConfig::DUAL_BANK, OtaState::Other);

    let address = FLASH_START + SECTOR_SIZE;
    assert_eq!(flash.erase(address), Err(Error::OutOfRange { address }));
    assert_eq!(sim.write_count(), 0);
    assert!(all_bytes(&sim, FLASH_START, 0x00));

    flash.erase(FLASH_START + SECTOR_SIZE * 2).unwrap();
    assert_eq!(sim.erased_sectors(), vec![FLASH_START + SECTOR_SIZE * 2]);
    assert!(all_bytes(&sim, FLASH_START + SECTOR_SIZE, 0x00));
}

#[test]
fn test_erase_clears_stale_errors_first() {
    let sim = SimulatedFlash::builder(2048).build();
    sim.raise_status(Bank::One, SR_PGSERR);
    let mut flash = FlashDevice::new(&sim, DeviceConfig::DUAL_BANK, OtaState::Other);

    flash.erase(FLASH_START).unwrap();

    assert_eq!(sim.status(Bank::One) & SR_ERRORS.mask(), 0);
}

#[test]
fn test_erase_waits_out_busy_flags() {
    let sim = SimulatedFlash::builder(2048).busy_polls(500).fill(0x00).build();
    let mut flash = FlashDevice::new(&sim, DeviceConfig::DUAL_BANK, OtaState::Other);

    flash.erase(FLASH_START).unwrap();

    assert!(!flash.is_error(Bank::One));
    assert!(all_bytes(&sim, FLASH_START, 0xFF));
}

#[test]
fn test_erase_hardware_fault() {
    let sim = SimulatedFlash::builder(2048)
        .fill(0x00)
        .fail_erase_at(FLASH_START + SECTOR_SIZE)
        .build();
    let mut flash = FlashDevice::new(&sim, DeviceConfig::DUAL_BANK, OtaState::Other);

    let err = flash.erase(FLASH_START + SECTOR_SIZE).unwrap_err();

    match err {
        Error::HardwareFault { control, status } => {
            assert!(status & SR_OPERR != 0);
            assert_eq!(CR_SNB.decode(control), 1);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(!err.is_alignment());
    assert!(sim.erased_sectors().is_empty());

    let event = flash.last_event().unwrap();
    assert_eq!(event.op, Operation::Erase);
    assert!(!event.ok);
    assert!(event.status & SR_OPERR != 0);
}

#[test]
fn test_erase_after_fault_recovers() {
    let sim = SimulatedFlash::builder(2048)
        .fail_erase_at(FLASH_START + SECTOR_SIZE)
        .build();
    let mut flash = FlashDevice::new(&sim, DeviceConfig::DUAL_BANK, OtaState::Other);

    assert!(flash.erase(FLASH_START + SECTOR_SIZE).is_err());
    flash.erase(FLASH_START).unwrap();

    assert_eq!(sim.erased_sectors(), vec![FLASH_START]);
}

#[test]
fn test_erase_keeps_interrupts_enabled() {
    let sim = SimulatedFlash::builder(2048).build();
    let mut flash = FlashDevice::new(&sim, DeviceConfig::DUAL_BANK, OtaState::Other);

    flash.erase(FLASH_START).unwrap();

    assert_eq!(sim.masked_erases(), 0);
    assert!(!sim.interrupts_masked());
}

#[test]
fn test_erase_event_records_registers() {
    let sim = SimulatedFlash::builder(2048).build();
    let mut flash = FlashDevice::new(&sim, DeviceConfig::DUAL_BANK, OtaState::Other);

    flash.erase(FLASH_START + SECTOR_SIZE * 2).unwrap();

    let event = flash.last_event().unwrap();
    assert_eq!(event.op, Operation::Erase);
    assert_eq!(event.address, FLASH_START + SECTOR_SIZE * 2);
    assert_eq!(event.len, SECTOR_SIZE);
    assert!(event.ok);
    assert_eq!(event.control, sim.control(Bank::One));
    assert_eq!(CR_SNB.decode(event.control), 2);
}
