// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Diagnostics journal of flash operations.

use heapless::HistoryBuffer;
use serde::{Deserialize, Serialize};

/// Number of events kept before the oldest are overwritten.
pub const JOURNAL_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Operation {
    Erase,
    Write,
    SwapBank,
}

/// One completed (or rejected) operation with the raw register state
/// captured when it finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlashEvent {
    pub op: Operation,
    pub address: u32,
    pub len: u32,
    pub ok: bool,
    pub control: u32,
    pub status: u32,
}

pub(crate) struct Journal {
    events: HistoryBuffer<FlashEvent, JOURNAL_DEPTH>,
}

impl Journal {
    pub(crate) const fn new() -> Self {
        Self {
            events: HistoryBuffer::new(),
        }
    }

    pub(crate) fn record(&mut self, event: FlashEvent) {
        log_event(&event);
        self.events.write(event);
    }

    pub(crate) fn last(&self) -> Option<&FlashEvent> {
        self.events.recent()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &FlashEvent> + '_ {
        self.events.oldest_ordered()
    }

    pub(crate) fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(feature = "defmt")]
fn log_event(event: &FlashEvent) {
    if event.ok {
        defmt::debug!(
            "{:?} {} bytes @ 0x{:08x}: ok. CR 0x{:08x} SR 0x{:08x}",
            event.op,
            event.len,
            event.address,
            event.control,
            event.status
        );
    } else {
        defmt::error!(
            "{:?} {} bytes @ 0x{:08x}: fail. CR 0x{:08x} SR 0x{:08x}",
            event.op,
            event.len,
            event.address,
            event.control,
            event.status
        );
    }
}

#[cfg(not(feature = "defmt"))]
fn log_event(_event: &FlashEvent) {}

/// Report a request refused before touching the controller.
#[cfg(feature = "defmt")]
pub(crate) fn log_rejected(op: Operation, error: &crate::Error) {
    defmt::error!("{:?} rejected: {}", op, error);
}

#[cfg(not(feature = "defmt"))]
pub(crate) fn log_rejected(_op: Operation, _error: &crate::Error) {}
