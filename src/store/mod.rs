// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Persistent session state.
//!
//! The mesh stack keeps its own provisioning data, but the transaction id and
//! the last commanded on/off value are application state that must survive a
//! power cycle. This module stores that [`SessionRecord`].
//!
//! # Atomicity
//!
//! A write either fully replaces the previous record or leaves it intact.
//! [`DoubleBufferStore`] provides that over any raw [`Medium`] by alternating
//! between two checksummed slots and restoring the newest valid one.
//!
//! # Examples
//!
//! ```
//! use mesh_switch::store::{DoubleBufferStore, MemoryMedium, SessionRecord, SessionStore};
//!
//! let mut store = DoubleBufferStore::new(MemoryMedium::new());
//!
//! // Blank medium: nothing has ever been written
//! assert_eq!(store.restore().unwrap(), None);
//!
//! let record = SessionRecord::new(6, false);
//! store.store(record).unwrap();
//! assert_eq!(store.restore().unwrap(), Some(record));
//! ```

mod double_buffer;
mod file;
mod medium;
mod slot;

pub use double_buffer::DoubleBufferStore;
pub use file::FileMedium;
pub use medium::{Medium, MemoryMedium, Slot};

use crate::error::StorageError;

/// Application state persisted across power cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SessionRecord {
    /// Transaction id of the most recently published command.
    pub transaction_id: u8,
    /// On/off value the next command will carry.
    pub on_off: bool,
}

impl SessionRecord {
    /// Size of the encoded record.
    pub const LEN: usize = 2;

    /// Creates a record.
    #[must_use]
    pub const fn new(transaction_id: u8, on_off: bool) -> Self {
        Self {
            transaction_id,
            on_off,
        }
    }

    /// Encodes as `[transaction_id, on_off]`.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        [self.transaction_id, u8::from(self.on_off)]
    }

    /// Decodes from `[transaction_id, on_off]`.
    ///
    /// Returns `None` if the on/off byte is neither 0 nor 1.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; Self::LEN]) -> Option<Self> {
        match bytes[1] {
            0 => Some(Self::new(bytes[0], false)),
            1 => Some(Self::new(bytes[0], true)),
            _ => None,
        }
    }
}

/// Durable storage for the [`SessionRecord`].
pub trait SessionStore {
    /// Reads the stored record.
    ///
    /// Returns `Ok(None)` only when no record was ever written.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the medium cannot be read or the stored
    /// record is corrupt.
    fn restore(&mut self) -> Result<Option<SessionRecord>, StorageError>;

    /// Replaces the stored record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails. The previously stored
    /// record is then still the one `restore` returns.
    fn store(&mut self, record: SessionRecord) -> Result<(), StorageError>;
}

impl<S: SessionStore + ?Sized> SessionStore for Box<S> {
    fn restore(&mut self) -> Result<Option<SessionRecord>, StorageError> {
        (**self).restore()
    }

    fn store(&mut self, record: SessionRecord) -> Result<(), StorageError> {
        (**self).store(record)
    }
}
