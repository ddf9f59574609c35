// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Provisioning lifecycle.
//!
//! The mesh stack reports provisioning progress as one-shot notifications.
//! [`ProvisioningMachine`] folds them into a [`ProvisioningState`]:
//!
//! ```text
//! Unregistered --registration complete--> Registered
//! Registered   --link opened(b)---------> LinkOpen(b)
//! LinkOpen(b)  --link closed(b')--------> LinkClosed(b')
//! LinkClosed   --link opened(b)---------> LinkOpen(b)
//! LinkOpen(b)  --provisioning complete--> Provisioned
//! Registered   --provisioning complete--> Provisioned   (restored by the stack)
//! Provisioned  --node reset-------------> Unregistered
//! ```
//!
//! Any other event is ignored in the current state.
//!
//! # Examples
//!
//! ```
//! use mesh_switch::provisioning::{ProvisioningEvent, ProvisioningMachine, ProvisioningState};
//! use mesh_switch::types::Bearer;
//!
//! let mut machine = ProvisioningMachine::new();
//! machine.apply(&ProvisioningEvent::RegistrationComplete { result: 0 });
//! machine.apply(&ProvisioningEvent::LinkOpened(Bearer::Advertising));
//!
//! assert_eq!(machine.state(), &ProvisioningState::LinkOpen(Bearer::Advertising));
//! assert!(!machine.is_provisioned());
//! ```

use std::fmt;

use crate::types::{Bearer, IvIndex, NetKeyIndex, UnicastAddress};

/// Network parameters assigned during provisioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisionInfo {
    /// Index of the network key the node was given.
    pub net_index: NetKeyIndex,
    /// Unicast address of the primary element.
    pub address: UnicastAddress,
    /// Key refresh / IV update flags.
    pub flags: u8,
    /// Current IV index.
    pub iv_index: IvIndex,
}

/// Where the node is in the provisioning lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProvisioningState {
    /// Composition not yet registered with the stack.
    #[default]
    Unregistered,
    /// Registered and (about to be) advertising as unprovisioned.
    Registered,
    /// A provisioner opened a link.
    LinkOpen(Bearer),
    /// The provisioning link closed without completing.
    LinkClosed(Bearer),
    /// Member of a network.
    Provisioned(ProvisionInfo),
}

impl ProvisioningState {
    /// Short state name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Unregistered => "unregistered",
            Self::Registered => "registered",
            Self::LinkOpen(_) => "link-open",
            Self::LinkClosed(_) => "link-closed",
            Self::Provisioned(_) => "provisioned",
        }
    }
}

impl fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LinkOpen(bearer) | Self::LinkClosed(bearer) => {
                write!(f, "{}({bearer})", self.name())
            }
            Self::Provisioned(info) => write!(f, "{}({})", self.name(), info.address),
            _ => f.write_str(self.name()),
        }
    }
}

/// Provisioning notifications from the mesh stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningEvent {
    /// Composition and capabilities were registered. `result` is the stack's
    /// status code (0 = success).
    RegistrationComplete {
        /// Stack status code.
        result: i32,
    },
    /// Unprovisioned-device advertising was enabled.
    ProvisioningEnabled {
        /// Stack status code.
        result: i32,
    },
    /// A provisioning link was opened.
    LinkOpened(Bearer),
    /// A provisioning link was closed.
    LinkClosed(Bearer),
    /// Provisioning finished.
    Complete(ProvisionInfo),
    /// The node was removed from the network.
    NodeReset,
    /// The advertised device name was set.
    UnprovisionedNameSet {
        /// Stack status code.
        result: i32,
    },
}

/// Effect of applying an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The state changed.
    Changed {
        /// State before the event.
        from: ProvisioningState,
        /// State after the event.
        to: ProvisioningState,
    },
    /// The event is valid here but does not change the state.
    Unchanged,
    /// The event is not expected in the current state.
    Ignored,
}

/// Tracks the provisioning state.
#[derive(Debug, Clone, Default)]
pub struct ProvisioningMachine {
    state: ProvisioningState,
}

impl ProvisioningMachine {
    /// Creates a machine in [`ProvisioningState::Unregistered`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &ProvisioningState {
        &self.state
    }

    /// Returns `true` once the node is a network member.
    #[must_use]
    pub fn is_provisioned(&self) -> bool {
        matches!(self.state, ProvisioningState::Provisioned(_))
    }

    /// Network parameters, if provisioned.
    #[must_use]
    pub fn provision_info(&self) -> Option<&ProvisionInfo> {
        match &self.state {
            ProvisioningState::Provisioned(info) => Some(info),
            _ => None,
        }
    }

    /// Applies a stack notification.
    pub fn apply(&mut self, event: &ProvisioningEvent) -> Transition {
        use ProvisioningEvent as E;
        use ProvisioningState as S;

        let next = match (&self.state, event) {
            (S::Unregistered, E::RegistrationComplete { result: 0 }) => S::Registered,
            (S::Registered | S::LinkClosed(_), E::LinkOpened(bearer)) => S::LinkOpen(*bearer),
            (S::LinkOpen(_), E::LinkClosed(bearer)) => S::LinkClosed(*bearer),
            (S::LinkOpen(_) | S::Registered, E::Complete(info)) => S::Provisioned(*info),
            (S::Provisioned(_), E::NodeReset) => S::Unregistered,
            (S::Registered, E::ProvisioningEnabled { result }) => {
                tracing::info!(result, "Provisioning advertising enabled");
                return Transition::Unchanged;
            }
            (_, E::UnprovisionedNameSet { result }) => {
                tracing::info!(result, "Unprovisioned device name set");
                return Transition::Unchanged;
            }
            (state, event) => {
                tracing::debug!(state = %state, ?event, "Ignoring provisioning event");
                return Transition::Ignored;
            }
        };

        let from = std::mem::replace(&mut self.state, next);
        match &next {
            S::LinkOpen(bearer) => tracing::info!(%bearer, "Provisioning link opened"),
            S::LinkClosed(bearer) => tracing::info!(%bearer, "Provisioning link closed"),
            S::Provisioned(info) => tracing::info!(
                net_index = %info.net_index,
                address = %info.address,
                flags = info.flags,
                iv_index = %info.iv_index,
                "Provisioning complete"
            ),
            S::Registered => tracing::info!("Mesh composition registered"),
            S::Unregistered => tracing::info!("Node reset, left the network"),
        }
        Transition::Changed { from, to: next }
    }
}
