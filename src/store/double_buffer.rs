// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Double-buffered session store.

use crate::error::StorageError;

use super::slot::SlotImage;
use super::{Medium, SessionRecord, SessionStore, Slot};

/// Result of reading both slots.
#[derive(Debug, Default)]
struct Scan {
    newest: Option<(Slot, SlotImage)>,
    corrupt: Option<StorageError>,
}

/// [`SessionStore`] that never overwrites the current record in place.
///
/// Each write goes to the slot not holding the newest record, tagged with the
/// next generation number. A write torn by power loss leaves a slot that
/// fails its checksum, and `restore` falls back to the other slot.
///
/// # Examples
///
/// ```
/// use mesh_switch::store::{DoubleBufferStore, MemoryMedium, SessionRecord, SessionStore};
///
/// let medium = MemoryMedium::new();
/// let mut store = DoubleBufferStore::new(medium.clone());
///
/// store.store(SessionRecord::new(1, true)).unwrap();
///
/// // A power loss while writing the next record
/// medium.tear_next_write();
/// assert!(store.store(SessionRecord::new(2, false)).is_err());
///
/// // The previous record survives
/// let mut reopened = DoubleBufferStore::new(medium);
/// assert_eq!(reopened.restore().unwrap(), Some(SessionRecord::new(1, true)));
/// ```
#[derive(Debug)]
pub struct DoubleBufferStore<M> {
    medium: M,
    /// Slot and generation of the newest valid record, once known.
    newest: Option<(Slot, u16)>,
    scanned: bool,
}

impl<M: Medium> DoubleBufferStore<M> {
    /// Wraps a medium.
    #[must_use]
    pub fn new(medium: M) -> Self {
        Self {
            medium,
            newest: None,
            scanned: false,
        }
    }

    /// Returns the underlying medium.
    #[must_use]
    pub fn medium(&self) -> &M {
        &self.medium
    }

    fn scan(&mut self) -> Result<Scan, StorageError> {
        let mut scan = Scan::default();

        for slot in Slot::ALL {
            let Some(bytes) = self.medium.read(slot)? else {
                continue;
            };

            match SlotImage::decode(&bytes) {
                Ok(image) => {
                    let newer = scan
                        .newest
                        .as_ref()
                        .is_none_or(|(_, current)| image.is_newer_than(current));
                    if newer {
                        scan.newest = Some((slot, image));
                    }
                }
                Err(reason) => {
                    tracing::warn!(slot = slot.index(), %reason, "Rejected stored session slot");
                    if scan.corrupt.is_none() {
                        scan.corrupt = Some(StorageError::Corrupt {
                            slot: slot.index(),
                            reason,
                        });
                    }
                }
            }
        }

        self.newest = scan
            .newest
            .as_ref()
            .map(|(slot, image)| (*slot, image.generation));
        self.scanned = true;
        Ok(scan)
    }
}

impl<M: Medium> SessionStore for DoubleBufferStore<M> {
    fn restore(&mut self) -> Result<Option<SessionRecord>, StorageError> {
        let scan = self.scan()?;

        match (scan.newest, scan.corrupt) {
            (Some((slot, image)), _) => {
                tracing::debug!(
                    slot = slot.index(),
                    generation = image.generation,
                    tid = image.record.transaction_id,
                    on_off = image.record.on_off,
                    "Restored session slot"
                );
                Ok(Some(image.record))
            }
            (None, Some(err)) => Err(err),
            (None, None) => Ok(None),
        }
    }

    fn store(&mut self, record: SessionRecord) -> Result<(), StorageError> {
        if !self.scanned {
            // Corrupt slots are simply overwritten
            self.scan()?;
        }

        let (slot, generation) = match self.newest {
            Some((slot, generation)) => (slot.other(), generation.wrapping_add(1)),
            None => (Slot::A, 0),
        };

        let image = SlotImage { generation, record };
        self.medium
            .write(slot, &image.encode())
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;

        tracing::debug!(
            slot = slot.index(),
            generation,
            tid = record.transaction_id,
            on_off = record.on_off,
            "Stored session slot"
        );
        self.newest = Some((slot, generation));
        Ok(())
    }
}
