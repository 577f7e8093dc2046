// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Boundary to the OTA state manager.

/// Firmware state as reported by the OTA manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OtaState {
    /// First boot since the image was flashed by a programmer.
    FirstBoot,
    Other,
}

/// Source of the current firmware's OTA state, consulted by the unlock logic.
pub trait OtaStatus {
    fn firmware_status(&self) -> OtaState;
}

impl OtaStatus for OtaState {
    fn firmware_status(&self) -> OtaState {
        *self
    }
}

impl<F: Fn() -> OtaState> OtaStatus for F {
    fn firmware_status(&self) -> OtaState {
        self()
    }
}
