// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-process transport.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::composition::{Composition, ModelHandle};
use crate::error::TransportError;
use crate::identity::DeviceIdentity;
use crate::types::{Address, BearerSet, Opcode};

use super::MeshTransport;

/// A message handed to the loopback transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Sending model.
    pub model: ModelHandle,
    /// Publish address at the time of sending.
    pub destination: Address,
    /// Access-layer opcode.
    pub opcode: Opcode,
    /// Message parameters.
    pub payload: Vec<u8>,
}

#[derive(Debug, Default)]
struct Inner {
    identity: Option<DeviceIdentity>,
    composition: Option<Composition>,
    provisioning_bearers: Option<BearerSet>,
    unprovisioned_name: Option<String>,
    publications: HashMap<ModelHandle, Address>,
    sent: Vec<SentMessage>,
    fail_initialize: Option<TransportError>,
    fail_sends: Option<TransportError>,
    fail_next_send: Option<TransportError>,
}

/// [`MeshTransport`] that keeps everything in memory.
///
/// Clones share state, so a test can keep one clone to configure publication
/// addresses, inject failures and inspect sent messages while the node owns
/// another.
///
/// # Examples
///
/// ```
/// use mesh_switch::Composition;
/// use mesh_switch::identity::DeviceIdentity;
/// use mesh_switch::transport::{LoopbackTransport, MeshTransport};
/// use mesh_switch::types::{Address, ModelId, Opcode};
///
/// let comp = Composition::switch_node();
/// let client = comp.handle(ModelId::GENERIC_ONOFF_CLIENT).unwrap();
///
/// let mut transport = LoopbackTransport::new();
/// transport.initialize(&DeviceIdentity::random(), &comp).unwrap();
/// transport.set_publication(client, Address::from_raw(0xC000));
///
/// transport
///     .send_unacknowledged(client, Opcode::GENERIC_ONOFF_SET_UNACK, &[1, 1])
///     .unwrap();
/// assert_eq!(transport.sent().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LoopbackTransport {
    inner: Arc<Mutex<Inner>>,
}

impl LoopbackTransport {
    /// Creates an uninitialized transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets (or clears) the publish address of `model`.
    pub fn set_publication(&self, model: ModelHandle, address: impl Into<Option<Address>>) {
        let mut inner = self.inner.lock();
        match address.into() {
            Some(address) => inner.publications.insert(model, address),
            None => inner.publications.remove(&model),
        };
    }

    /// Makes the next `initialize` call fail with `error`.
    pub fn fail_initialize(&self, error: TransportError) {
        self.inner.lock().fail_initialize = Some(error);
    }

    /// Makes every send fail with `error` until cleared with `None`.
    pub fn fail_sends(&self, error: impl Into<Option<TransportError>>) {
        self.inner.lock().fail_sends = error.into();
    }

    /// Makes only the next send fail with `error`.
    pub fn fail_next_send(&self, error: TransportError) {
        self.inner.lock().fail_next_send = Some(error);
    }

    /// Messages handed off so far, oldest first.
    #[must_use]
    pub fn sent(&self) -> Vec<SentMessage> {
        self.inner.lock().sent.clone()
    }

    /// Removes and returns the messages handed off so far.
    #[must_use]
    pub fn take_sent(&self) -> Vec<SentMessage> {
        std::mem::take(&mut self.inner.lock().sent)
    }

    /// Returns `true` once `initialize` has succeeded.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.inner.lock().identity.is_some()
    }

    /// Identity registered by `initialize`.
    #[must_use]
    pub fn identity(&self) -> Option<DeviceIdentity> {
        self.inner.lock().identity
    }

    /// Composition registered by `initialize`.
    #[must_use]
    pub fn composition(&self) -> Option<Composition> {
        self.inner.lock().composition.clone()
    }

    /// Bearers passed to the last `enable_provisioning` call.
    #[must_use]
    pub fn provisioning_bearers(&self) -> Option<BearerSet> {
        self.inner.lock().provisioning_bearers
    }

    /// Name passed to the last `set_unprovisioned_name` call.
    #[must_use]
    pub fn unprovisioned_name(&self) -> Option<String> {
        self.inner.lock().unprovisioned_name.clone()
    }
}

impl MeshTransport for LoopbackTransport {
    fn initialize(
        &mut self,
        identity: &DeviceIdentity,
        composition: &Composition,
    ) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        if let Some(err) = inner.fail_initialize.take() {
            return Err(err);
        }
        inner.identity = Some(*identity);
        inner.composition = Some(composition.clone());
        Ok(())
    }

    fn enable_provisioning(&mut self, bearers: BearerSet) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        if inner.identity.is_none() {
            return Err(TransportError::NotInitialized);
        }
        inner.provisioning_bearers = Some(bearers);
        Ok(())
    }

    fn set_unprovisioned_name(&mut self, name: &str) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        if inner.identity.is_none() {
            return Err(TransportError::NotInitialized);
        }
        inner.unprovisioned_name = Some(name.to_owned());
        Ok(())
    }

    fn publication(&self, model: ModelHandle) -> Option<Address> {
        self.inner.lock().publications.get(&model).copied()
    }

    fn send_unacknowledged(
        &mut self,
        model: ModelHandle,
        opcode: Opcode,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        if inner.identity.is_none() {
            return Err(TransportError::NotInitialized);
        }
        if let Some(err) = inner.fail_next_send.take() {
            return Err(err);
        }
        if let Some(err) = &inner.fail_sends {
            return Err(err.clone());
        }
        let destination = inner
            .publications
            .get(&model)
            .copied()
            .ok_or(TransportError::NoDestination)?;

        inner.sent.push(SentMessage {
            model,
            destination,
            opcode,
            payload: payload.to_vec(),
        });
        Ok(())
    }
}
