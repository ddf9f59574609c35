// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The mesh stack as seen from the node.
//!
//! Radio bearers, key management, message security and relaying live in the
//! mesh stack. The node drives it through [`MeshTransport`] and receives its
//! notifications as [`NodeEvent`](crate::event::NodeEvent)s.
//!
//! All calls are hand-offs: they queue work in the stack and return without
//! waiting for the radio.
//!
//! # Implementations
//!
//! - [`LoopbackTransport`]: in-process stack that records sent messages, for
//!   tests and host-side simulation

mod loopback;

pub use loopback::{LoopbackTransport, SentMessage};

use crate::command::MeshMessage;
use crate::composition::{Composition, ModelHandle};
use crate::error::TransportError;
use crate::identity::DeviceIdentity;
use crate::types::{Address, BearerSet, Opcode};

/// Operations the node needs from the mesh stack.
pub trait MeshTransport {
    /// Registers the node's identity, composition and provisioning
    /// capabilities. Completion is reported later as
    /// [`ProvisioningEvent::RegistrationComplete`](crate::provisioning::ProvisioningEvent::RegistrationComplete).
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the stack refuses the registration.
    fn initialize(
        &mut self,
        identity: &DeviceIdentity,
        composition: &Composition,
    ) -> Result<(), TransportError>;

    /// Starts advertising as an unprovisioned device on `bearers`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if advertising cannot be enabled.
    fn enable_provisioning(&mut self, bearers: BearerSet) -> Result<(), TransportError>;

    /// Sets the name advertised while unprovisioned.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the stack rejects the name.
    fn set_unprovisioned_name(&mut self, name: &str) -> Result<(), TransportError>;

    /// Publish address configured for `model`, if any.
    fn publication(&self, model: ModelHandle) -> Option<Address>;

    /// Queues an unacknowledged message on `model`'s publication.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the message could not be handed off.
    fn send_unacknowledged(
        &mut self,
        model: ModelHandle,
        opcode: Opcode,
        payload: &[u8],
    ) -> Result<(), TransportError>;

    /// Encodes and sends a typed message.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the message could not be handed off.
    fn send_message<M: MeshMessage>(
        &mut self,
        model: ModelHandle,
        message: &M,
    ) -> Result<(), TransportError>
    where
        Self: Sized,
    {
        self.send_unacknowledged(model, message.opcode(), &message.payload())
    }
}
