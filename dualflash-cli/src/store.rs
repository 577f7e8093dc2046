// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Device image file.
//!
//! The file holds the postcard encoding of the simulated array, its committed
//! option bytes and the operations recorded by earlier invocations.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use dualflash_core::sim::{SimImage, SimulatedFlash};
use dualflash_core::{FlashDevice, FlashEvent, OtaState};

/// Operations kept across invocations.
pub const HISTORY_DEPTH: usize = 64;

#[derive(Serialize, Deserialize)]
struct Stored {
    image: SimImage,
    history: Vec<FlashEvent>,
}

/// A simulated device loaded from its image file.
pub struct Session {
    path: PathBuf,
    sim: SimulatedFlash,
    history: Vec<FlashEvent>,
}

impl Session {
    /// Fresh device, not yet saved.
    pub fn create(path: &Path, image: SimImage) -> Self {
        Self {
            path: path.to_path_buf(),
            sim: SimulatedFlash::from_image(image),
            history: Vec::new(),
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| {
            format!(
                "Failed to read {} (run `dualflash init` first)",
                path.display()
            )
        })?;
        let stored: Stored = postcard::from_bytes(&bytes)
            .with_context(|| format!("{} is not a device image", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            sim: SimulatedFlash::from_image(stored.image),
            history: stored.history,
        })
    }

    pub fn save(&self) -> Result<()> {
        let stored = Stored {
            image: self.sim.image(),
            history: self.history.clone(),
        };
        let bytes = postcard::to_stdvec(&stored).context("Failed to encode device image")?;
        fs::write(&self.path, bytes)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }

    pub fn device(&self) -> &SimulatedFlash {
        &self.sim
    }

    pub fn history(&self) -> &[FlashEvent] {
        &self.history
    }

    /// Run `f` against a fresh engine handle and keep what it recorded, even
    /// when `f` fails.
    pub fn run<T>(
        &mut self,
        status: OtaState,
        f: impl FnOnce(&mut FlashDevice<&SimulatedFlash>) -> Result<T>,
    ) -> Result<T> {
        let mut flash = FlashDevice::new(&self.sim, self.sim.device_config(), status);
        let result = f(&mut flash);

        self.history.extend(flash.events().copied());
        if self.history.len() > HISTORY_DEPTH {
            let excess = self.history.len() - HISTORY_DEPTH;
            self.history.drain(..excess);
        }
        result
    }
}

/// Load the device at `path`, run `f`, and write the device back.
pub fn with_device<T>(
    path: &Path,
    status: OtaState,
    f: impl FnOnce(&mut FlashDevice<&SimulatedFlash>) -> Result<T>,
) -> Result<T> {
    let mut session = Session::open(path)?;
    let result = session.run(status, f);
    session.save()?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("dualflash-{}-{}.img", name, std::process::id()))
    }

    #[test]
    fn test_session_round_trip() {
        let path = temp_path("round-trip");
        let image = SimulatedFlash::builder(256).build().image();
        Session::create(&path, image).save().unwrap();

        with_device(&path, OtaState::Other, |flash| {
            flash.write(dualflash_core::FLASH_START, &[0x11; 64])?;
            flash.swap_bank()?;
            Ok(())
        })
        .unwrap();

        let session = Session::open(&path).unwrap();
        assert!(session.device().is_swapped());
        assert_eq!(
            session.device().bytes(dualflash_core::FLASH_START, 64),
            vec![0x11; 64]
        );
        assert_eq!(session.history().len(), 3);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_failed_operation_is_saved() {
        let path = temp_path("failed");
        let image = SimulatedFlash::builder(256).build().image();
        Session::create(&path, image).save().unwrap();

        let result = with_device(&path, OtaState::Other, |flash| {
            flash.erase(dualflash_core::FLASH_START)?;
            flash.erase(dualflash_core::FLASH_START + 4)?;
            Ok(())
        });
        assert!(result.is_err());

        let session = Session::open(&path).unwrap();
        assert_eq!(session.history().len(), 1);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_history_is_bounded() {
        let mut session = Session::create(
            &temp_path("bounded"),
            SimulatedFlash::builder(256).build().image(),
        );
        for _ in 0..5 {
            session
                .run(OtaState::Other, |flash| {
                    for _ in 0..16 {
                        flash.erase(dualflash_core::FLASH_START)?;
                    }
                    Ok(())
                })
                .unwrap();
        }
        assert_eq!(session.history().len(), HISTORY_DEPTH);
    }

    #[test]
    fn test_open_rejects_garbage() {
        let path = temp_path("garbage");
        fs::write(&path, [0xFFu8; 3]).unwrap();
        assert!(Session::open(&path).is_err());
        fs::remove_file(&path).unwrap();
    }
}
