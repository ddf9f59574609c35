// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inbound events.

use crate::configuration::ConfigurationEvent;
use crate::provisioning::ProvisioningEvent;
use crate::types::Opcode;

/// Notifications from the generic client models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenericClientEvent {
    /// Status reply to a get.
    GetState {
        /// Opcode of the request.
        opcode: Opcode,
        /// Present on/off value reported by the server.
        present: bool,
    },
    /// Status reply to an acknowledged set.
    SetState {
        /// Opcode of the request.
        opcode: Opcode,
        /// Present on/off value reported by the server.
        present: bool,
    },
    /// A status message published by a server.
    Publish {
        /// Opcode of the published message.
        opcode: Opcode,
    },
    /// An acknowledged request got no reply in time.
    Timeout {
        /// Opcode of the request.
        opcode: Opcode,
    },
}

/// Everything the node reacts to, serialized through one dispatcher.
///
/// # Examples
///
/// ```
/// use mesh_switch::event::{GenericClientEvent, NodeEvent};
/// use mesh_switch::types::Opcode;
///
/// let timeout = NodeEvent::from(GenericClientEvent::Timeout {
///     opcode: Opcode::GENERIC_ONOFF_SET,
/// });
/// assert_eq!(timeout.kind(), "generic-client");
/// assert_eq!(NodeEvent::Trigger.kind(), "trigger");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeEvent {
    /// The physical switch was activated.
    Trigger,
    /// Provisioning progress from the mesh stack.
    Provisioning(ProvisioningEvent),
    /// A configuration-server change.
    Configuration(ConfigurationEvent),
    /// A generic client model notification.
    GenericClient(GenericClientEvent),
    /// A delayed resend is due.
    RetryDue,
}

impl NodeEvent {
    /// Event category for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Trigger => "trigger",
            Self::Provisioning(_) => "provisioning",
            Self::Configuration(_) => "configuration",
            Self::GenericClient(_) => "generic-client",
            Self::RetryDue => "retry-due",
        }
    }
}

impl From<ProvisioningEvent> for NodeEvent {
    fn from(event: ProvisioningEvent) -> Self {
        Self::Provisioning(event)
    }
}

impl From<ConfigurationEvent> for NodeEvent {
    fn from(event: ConfigurationEvent) -> Self {
        Self::Configuration(event)
    }
}

impl From<GenericClientEvent> for NodeEvent {
    fn from(event: GenericClientEvent) -> Self {
        Self::GenericClient(event)
    }
}
