// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Node composition data.
//!
//! The composition describes which elements and models the node exposes. It is
//! handed to the mesh stack once at startup and never changes afterwards, so it
//! is plain data rather than behaviour.

use crate::types::{CompanyId, ModelId};

/// Network transmit parameters: how many extra copies of each PDU, and the
/// spacing between them.
///
/// # Examples
///
/// ```
/// use mesh_switch::composition::Transmit;
///
/// // 3 transmissions in total, 20 ms apart
/// let transmit = Transmit::new(2, 20);
/// assert_eq!(transmit.transmissions(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transmit {
    /// Retransmissions after the first copy (0-7).
    pub count: u8,
    /// Interval between copies in milliseconds (10-320, step 10).
    pub interval_ms: u16,
}

impl Transmit {
    /// Creates transmit parameters.
    #[must_use]
    pub const fn new(count: u8, interval_ms: u16) -> Self {
        Self { count, interval_ms }
    }

    /// Total number of copies sent.
    #[must_use]
    pub const fn transmissions(&self) -> u8 {
        self.count + 1
    }

    /// Packs into the single-byte form used by the configuration server.
    ///
    /// Low three bits carry the count, upper five bits the interval in 10 ms
    /// steps minus one.
    #[must_use]
    pub const fn encode(&self) -> u8 {
        let steps = (self.interval_ms / 10).saturating_sub(1);
        #[allow(clippy::cast_possible_truncation)]
        let steps = (steps & 0x1F) as u8;
        (steps << 3) | (self.count & 0x07)
    }
}

/// Local settings of the configuration server model.
// Each flag mirrors an independent foundation-model state.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigServerSettings {
    /// Relay feature enabled.
    pub relay: bool,
    /// Secure network beacons enabled.
    pub beacon: bool,
    /// Friend feature supported.
    pub friend: bool,
    /// GATT proxy enabled.
    pub gatt_proxy: bool,
    /// Default TTL for outgoing messages.
    pub default_ttl: u8,
    /// Network transmit parameters.
    pub net_transmit: Transmit,
    /// Relay retransmit parameters.
    pub relay_retransmit: Transmit,
}

impl Default for ConfigServerSettings {
    fn default() -> Self {
        Self {
            relay: false,
            beacon: true,
            friend: false,
            gatt_proxy: true,
            default_ttl: 7,
            net_transmit: Transmit::new(2, 20),
            relay_retransmit: Transmit::new(2, 20),
        }
    }
}

/// Out-of-band capabilities offered during provisioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OobCapabilities {
    /// Output OOB size (0 = none).
    pub output_size: u8,
    /// Output OOB action bitmask.
    pub output_actions: u16,
    /// Input OOB size (0 = none).
    pub input_size: u8,
    /// Input OOB action bitmask.
    pub input_actions: u16,
}

impl OobCapabilities {
    /// No OOB authentication.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            output_size: 0,
            output_actions: 0,
            input_size: 0,
            input_actions: 0,
        }
    }

    /// Returns `true` if no OOB method is offered.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        self.output_size == 0 && self.input_size == 0
    }
}

/// A model instance within an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelDecl {
    /// Which model.
    pub id: ModelId,
    /// Number of bytes reserved for the publication message.
    pub publication_len: Option<u8>,
}

/// An addressable element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// GATT namespace location descriptor.
    pub location: u16,
    /// Models in this element.
    pub models: Vec<ModelDecl>,
}

impl Element {
    /// Returns the position of `model` within this element, if present.
    #[must_use]
    pub fn position(&self, model: ModelId) -> Option<usize> {
        self.models.iter().position(|m| m.id == model)
    }
}

/// Handle to a model inside the composition, as understood by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelHandle {
    /// Element index.
    pub element: usize,
    /// Model identifier.
    pub model: ModelId,
}

/// Composition data of the node.
///
/// # Examples
///
/// ```
/// use mesh_switch::Composition;
/// use mesh_switch::types::ModelId;
///
/// let comp = Composition::switch_node();
/// assert_eq!(comp.elements().len(), 1);
/// assert!(comp.handle(ModelId::GENERIC_ONOFF_CLIENT).is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    company: CompanyId,
    elements: Vec<Element>,
    config_server: ConfigServerSettings,
    oob: OobCapabilities,
}

/// Publication buffer length for client models: opcode plus 3 payload bytes.
const CLIENT_PUBLICATION_LEN: u8 = 2 + 3;

impl Composition {
    /// The switch node: one element carrying a configuration server, a
    /// generic on/off client and a light lightness client.
    #[must_use]
    pub fn switch_node() -> Self {
        Self {
            company: CompanyId::ESPRESSIF,
            elements: vec![Element {
                location: 0,
                models: vec![
                    ModelDecl {
                        id: ModelId::CONFIG_SERVER,
                        publication_len: None,
                    },
                    ModelDecl {
                        id: ModelId::GENERIC_ONOFF_CLIENT,
                        publication_len: Some(CLIENT_PUBLICATION_LEN),
                    },
                    ModelDecl {
                        id: ModelId::LIGHT_LIGHTNESS_CLIENT,
                        publication_len: Some(CLIENT_PUBLICATION_LEN),
                    },
                ],
            }],
            config_server: ConfigServerSettings::default(),
            oob: OobCapabilities::none(),
        }
    }

    /// Company identifier reported in the composition page.
    #[must_use]
    pub fn company(&self) -> CompanyId {
        self.company
    }

    /// All elements, primary first.
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Configuration server settings.
    #[must_use]
    pub fn config_server(&self) -> &ConfigServerSettings {
        &self.config_server
    }

    /// Provisioning OOB capabilities.
    #[must_use]
    pub fn oob(&self) -> &OobCapabilities {
        &self.oob
    }

    /// Finds the first instance of `model`.
    #[must_use]
    pub fn handle(&self, model: ModelId) -> Option<ModelHandle> {
        self.elements
            .iter()
            .enumerate()
            .find(|(_, element)| element.position(model).is_some())
            .map(|(element, _)| ModelHandle { element, model })
    }
}
