// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Generic on/off client messages.

use crate::command::MeshMessage;
use crate::store::SessionRecord;
use crate::types::Opcode;

/// Generic on/off client message.
///
/// Set parameters are two bytes: the transaction id, then the on/off value.
///
/// # Examples
///
/// ```
/// use mesh_switch::command::{MeshMessage, OnOffCommand};
/// use mesh_switch::store::SessionRecord;
///
/// let cmd = OnOffCommand::from_record(SessionRecord::new(10, false));
/// assert_eq!(cmd.payload(), vec![0x0a, 0x00]);
/// assert!(!cmd.expects_status());
///
/// let query = OnOffCommand::Get;
/// assert!(query.payload().is_empty());
/// assert!(query.expects_status());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnOffCommand {
    /// Query the server's present state.
    Get,
    /// Set the state and request a status reply.
    Set {
        /// Transaction id.
        transaction_id: u8,
        /// Target on/off value.
        on_off: bool,
    },
    /// Set the state without a reply.
    SetUnacknowledged {
        /// Transaction id.
        transaction_id: u8,
        /// Target on/off value.
        on_off: bool,
    },
}

impl OnOffCommand {
    /// Creates an unacknowledged set.
    #[must_use]
    pub const fn set_unacknowledged(transaction_id: u8, on_off: bool) -> Self {
        Self::SetUnacknowledged {
            transaction_id,
            on_off,
        }
    }

    /// Creates an unacknowledged set carrying `record`.
    #[must_use]
    pub const fn from_record(record: SessionRecord) -> Self {
        Self::set_unacknowledged(record.transaction_id, record.on_off)
    }
}

impl MeshMessage for OnOffCommand {
    fn name(&self) -> &'static str {
        match self {
            Self::Get => "OnOffGet",
            Self::Set { .. } => "OnOffSet",
            Self::SetUnacknowledged { .. } => "OnOffSetUnack",
        }
    }

    fn opcode(&self) -> Opcode {
        match self {
            Self::Get => Opcode::GENERIC_ONOFF_GET,
            Self::Set { .. } => Opcode::GENERIC_ONOFF_SET,
            Self::SetUnacknowledged { .. } => Opcode::GENERIC_ONOFF_SET_UNACK,
        }
    }

    fn payload(&self) -> Vec<u8> {
        match *self {
            Self::Get => Vec::new(),
            Self::Set {
                transaction_id,
                on_off,
            }
            | Self::SetUnacknowledged {
                transaction_id,
                on_off,
            } => SessionRecord::new(transaction_id, on_off).to_bytes().to_vec(),
        }
    }

    fn expects_status(&self) -> bool {
        !matches!(self, Self::SetUnacknowledged { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_unack_wire_format() {
        let cmd = OnOffCommand::set_unacknowledged(0x06, true);
        assert_eq!(cmd.name(), "OnOffSetUnack");
        assert_eq!(cmd.opcode(), Opcode(0x8203));
        assert_eq!(cmd.payload(), vec![0x06, 0x01]);
    }

    #[test]
    fn acknowledged_set_shares_payload() {
        let cmd = OnOffCommand::Set {
            transaction_id: 0xff,
            on_off: false,
        };
        assert_eq!(cmd.opcode(), Opcode::GENERIC_ONOFF_SET);
        assert_eq!(cmd.payload(), vec![0xff, 0x00]);
        assert!(cmd.expects_status());
    }

    #[test]
    fn get_has_no_parameters() {
        assert_eq!(OnOffCommand::Get.opcode(), Opcode::GENERIC_ONOFF_GET);
        assert_eq!(OnOffCommand::Get.payload(), Vec::<u8>::new());
    }

    #[test]
    fn from_record_copies_fields() {
        let cmd = OnOffCommand::from_record(SessionRecord::new(3, true));
        assert_eq!(cmd, OnOffCommand::set_unacknowledged(3, true));
    }
}
