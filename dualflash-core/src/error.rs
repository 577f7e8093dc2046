// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

use core::fmt;

/// Flash operation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Address is not on the boundary the operation requires (a sector start
    /// for erase, a word for write).
    Misaligned { address: u32 },
    /// Address, or the end of the requested range, lies outside the flash array.
    OutOfRange { address: u32 },
    /// Write length is zero or not a multiple of the write alignment.
    LengthNotAligned { len: usize },
    /// The status register reported an error after the operation.
    ///
    /// The targeted region is undefined and must be erased again before use.
    HardwareFault { control: u32, status: u32 },
}

impl Error {
    /// `true` for requests rejected before any register was written.
    pub fn is_alignment(&self) -> bool {
        !matches!(self, Error::HardwareFault { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Misaligned { address } => write!(f, "0x{address:08x} is not aligned"),
            Error::OutOfRange { address } => {
                write!(f, "0x{address:08x} is outside the flash array")
            }
            Error::LengthNotAligned { len } => {
                write!(f, "length {len} is not a multiple of the write alignment")
            }
            Error::HardwareFault { control, status } => write!(
                f,
                "flash controller fault (CR 0x{control:08x}, SR 0x{status:08x})"
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
