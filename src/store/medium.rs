// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raw two-slot storage media.

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

/// One of the two record slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// First slot.
    A,
    /// Second slot.
    B,
}

impl Slot {
    /// Both slots, in index order.
    pub const ALL: [Self; 2] = [Self::A, Self::B];

    /// Numeric index of the slot.
    #[must_use]
    pub const fn index(&self) -> u8 {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }

    /// The slot that is not `self`.
    #[must_use]
    pub const fn other(&self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

/// A medium holding two independently writable slots.
///
/// A write to one slot must never disturb the other. A write may be torn by a
/// power loss; detecting that is the caller's job.
pub trait Medium {
    /// Reads a slot. Returns `Ok(None)` if the slot was never written.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the medium cannot be read.
    fn read(&mut self, slot: Slot) -> io::Result<Option<Vec<u8>>>;

    /// Overwrites a slot.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the write fails.
    fn write(&mut self, slot: Slot, bytes: &[u8]) -> io::Result<()>;
}

#[derive(Debug, Default)]
struct MemoryInner {
    slots: [Option<Vec<u8>>; 2],
    fail_writes: bool,
    fail_reads: bool,
    tear_next_write: bool,
    writes: usize,
}

/// In-memory medium with fault injection.
///
/// Clones share the same slots, so a test can keep a handle to inspect or
/// sabotage the medium after moving it into a store.
///
/// # Examples
///
/// ```
/// use mesh_switch::store::{Medium, MemoryMedium, Slot};
///
/// let mut medium = MemoryMedium::new();
/// let observer = medium.clone();
///
/// medium.write(Slot::A, &[1, 2, 3]).unwrap();
/// assert_eq!(observer.write_count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryMedium {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryMedium {
    /// Creates a blank medium.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }

    /// Makes every subsequent read fail (or succeed again).
    pub fn set_fail_reads(&self, fail: bool) {
        self.inner.lock().fail_reads = fail;
    }

    /// Simulates a power loss during the next write: only the first half of
    /// the bytes reach the slot, and the write reports an error.
    pub fn tear_next_write(&self) {
        self.inner.lock().tear_next_write = true;
    }

    /// Flips every bit of a stored slot.
    pub fn corrupt(&self, slot: Slot) {
        if let Some(bytes) = &mut self.inner.lock().slots[usize::from(slot.index())] {
            for byte in bytes.iter_mut() {
                *byte = !*byte;
            }
        }
    }

    /// Number of successful writes so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.inner.lock().writes
    }

    /// Raw contents of a slot.
    #[must_use]
    pub fn slot(&self, slot: Slot) -> Option<Vec<u8>> {
        self.inner.lock().slots[usize::from(slot.index())].clone()
    }
}

impl Medium for MemoryMedium {
    fn read(&mut self, slot: Slot) -> io::Result<Option<Vec<u8>>> {
        let inner = self.inner.lock();
        if inner.fail_reads {
            return Err(io::Error::other("injected read failure"));
        }
        Ok(inner.slots[usize::from(slot.index())].clone())
    }

    fn write(&mut self, slot: Slot, bytes: &[u8]) -> io::Result<()> {
        let mut inner = self.inner.lock();
        if inner.fail_writes {
            return Err(io::Error::other("injected write failure"));
        }
        if inner.tear_next_write {
            inner.tear_next_write = false;
            inner.slots[usize::from(slot.index())] = Some(bytes[..bytes.len() / 2].to_vec());
            return Err(io::Error::new(
                io::ErrorKind::Interrupted,
                "power lost during write",
            ));
        }
        inner.slots[usize::from(slot.index())] = Some(bytes.to_vec());
        inner.writes += 1;
        Ok(())
    }
}
