// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! On-medium slot format.
//!
//! ```text
//! +-------+---------+------------+-----+--------+---------+
//! | magic | version | generation | tid | on_off | crc16   |
//! | 1     | 1       | 2 (LE)     | 1   | 1      | 2 (LE)  |
//! +-------+---------+------------+-----+--------+---------+
//! ```
//!
//! The CRC covers everything before it.

use crc::{CRC_16_IBM_SDLC, Crc};

use super::SessionRecord;

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_SDLC);

const MAGIC: u8 = 0x5A;
const VERSION: u8 = 1;

/// Encoded slot length.
pub(super) const SLOT_LEN: usize = 8;

/// A decoded slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct SlotImage {
    pub generation: u16,
    pub record: SessionRecord,
}

impl SlotImage {
    pub(super) fn encode(&self) -> [u8; SLOT_LEN] {
        let mut bytes = [0u8; SLOT_LEN];
        bytes[0] = MAGIC;
        bytes[1] = VERSION;
        bytes[2..4].copy_from_slice(&self.generation.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.record.to_bytes());
        let crc = CRC16.checksum(&bytes[..6]);
        bytes[6..8].copy_from_slice(&crc.to_le_bytes());
        bytes
    }

    /// Decodes a slot, returning why it was rejected on failure.
    pub(super) fn decode(bytes: &[u8]) -> Result<Self, String> {
        if bytes.len() != SLOT_LEN {
            return Err(format!("expected {SLOT_LEN} bytes, found {}", bytes.len()));
        }
        if bytes[0] != MAGIC {
            return Err(format!("bad magic {:#04x}", bytes[0]));
        }
        let stored = u16::from_le_bytes([bytes[6], bytes[7]]);
        let computed = CRC16.checksum(&bytes[..6]);
        if stored != computed {
            return Err(format!(
                "checksum mismatch (stored {stored:#06x}, computed {computed:#06x})"
            ));
        }
        if bytes[1] != VERSION {
            return Err(format!("unsupported version {}", bytes[1]));
        }
        let record = SessionRecord::from_bytes([bytes[4], bytes[5]])
            .ok_or_else(|| format!("invalid on/off byte {:#04x}", bytes[5]))?;

        Ok(Self {
            generation: u16::from_le_bytes([bytes[2], bytes[3]]),
            record,
        })
    }

    /// Returns `true` if `self` was written after `other`, allowing the
    /// generation counter to wrap.
    pub(super) fn is_newer_than(&self, other: &Self) -> bool {
        #[allow(clippy::cast_possible_wrap)]
        let distance = self.generation.wrapping_sub(other.generation) as i16;
        distance > 0
    }
}
