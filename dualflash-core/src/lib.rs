// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! In-place flash engine for STM32H7-class parts: sector erase, aligned
//! programming, dual-bank swap and system reset. These are the primitives an
//! OTA updater needs to stage and activate a new image.
//!
//! This crate supports both `no_std` (embedded) and `std` (host) environments:
//! - `std` feature (default): host builds, enables the simulated device in [`sim`]
//! - `embedded` feature: memory-mapped register backend [`Mmio`] using `cortex-m`
//! - `defmt` feature: operation logging through `defmt`
//! - `dual-bank` feature: [`DeviceConfig::TARGET`] is the dual-bank profile
//!
//! A typical update, driven by the OTA manager:
//!
//! ```
//! use dualflash_core::{sim::SimulatedFlash, FlashDevice, OtaState};
//!
//! let sim = SimulatedFlash::builder(2048).build();
//! let mut flash = FlashDevice::new(&sim, sim.device_config(), OtaState::Other);
//!
//! let image = [0x5Au8; 256];
//! let slot = flash.inactive_region().unwrap();
//! flash.write(slot.start, &image).unwrap();
//! let mut readback = [0u8; 256];
//! flash.read(slot.start, &mut readback).unwrap();
//! assert_eq!(readback, image);
//! flash.swap_bank().unwrap();
//! flash.reset();
//! assert!(sim.is_swapped());
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

pub mod regs;

mod bank;
mod device;
mod erase;
mod error;
mod event;
mod geometry;
mod lock;
mod monitor;
mod ota;
mod reset;
mod swap;
mod write;

#[cfg(feature = "embedded")]
mod mmio;

#[cfg(feature = "std")]
pub mod sim;

pub use device::FlashDevice;
pub use error::Error;
pub use event::{FlashEvent, Operation, JOURNAL_DEPTH};
pub use geometry::{DeviceConfig, FLASH_START, SECTOR_SIZE, WORD_SIZE, WRITE_ALIGN};
pub use ota::{OtaState, OtaStatus};
pub use regs::{Bank, RegisterFile};

#[cfg(feature = "embedded")]
pub use mmio::Mmio;
