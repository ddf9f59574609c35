// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Access-layer messages sent by the client models.
//!
//! Each message knows its [`Opcode`] and how to encode its parameters. The
//! transport adds addressing and security.
//!
//! # Examples
//!
//! ```
//! use mesh_switch::command::{MeshMessage, OnOffCommand};
//! use mesh_switch::types::Opcode;
//!
//! let cmd = OnOffCommand::set_unacknowledged(6, true);
//!
//! assert_eq!(cmd.opcode(), Opcode::GENERIC_ONOFF_SET_UNACK);
//! assert_eq!(cmd.payload(), vec![0x06, 0x01]);
//! ```

mod onoff;

pub use onoff::OnOffCommand;

use crate::types::Opcode;

/// A message a client model can send.
pub trait MeshMessage {
    /// Short name for logs, e.g. `"OnOffSetUnack"`.
    fn name(&self) -> &'static str;

    /// The access-layer opcode.
    fn opcode(&self) -> Opcode;

    /// Encoded message parameters.
    fn payload(&self) -> Vec<u8>;

    /// Returns `true` if the receiver answers with a status message.
    fn expects_status(&self) -> bool {
        false
    }
}
