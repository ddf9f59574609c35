// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh Switch - the core of a Bluetooth mesh light switch node.
//!
//! The node joins a mesh network, is configured by a remote provisioner, and
//! then publishes a generic on/off toggle to its group each time the
//! physical switch fires.
//!
//! The radio stack and the switch driver are outside this crate. The node
//! drives the stack through the [`MeshTransport`](transport::MeshTransport)
//! trait and receives everything else as [`NodeEvent`](event::NodeEvent)s.
//!
//! # Features
//!
//! - **Provisioning**: tracks registration, provisioning links and node reset
//! - **Configuration**: watches app key, binding, subscription and
//!   publication changes; a new on/off client subscription publishes a toggle
//! - **Publishing**: transaction id and on/off value survive power loss, and
//!   unacknowledged sets are resent on timeout under a [`RetryPolicy`]
//! - **Storage**: double-buffered, checksummed session record over any
//!   [`Medium`](store::Medium)
//!
//! # Quick Start
//!
//! ```
//! use mesh_switch::{DeviceIdentity, Node, NodeConfig};
//! use mesh_switch::event::NodeEvent;
//! use mesh_switch::provisioning::{ProvisionInfo, ProvisioningEvent};
//! use mesh_switch::store::{DoubleBufferStore, MemoryMedium};
//! use mesh_switch::transport::LoopbackTransport;
//! use mesh_switch::types::{Address, IvIndex, ModelId, NetKeyIndex, UnicastAddress};
//!
//! # fn main() -> mesh_switch::Result<()> {
//! let transport = LoopbackTransport::new();
//! let mut node = Node::start(
//!     NodeConfig::default(),
//!     DeviceIdentity::from_mac([0x24, 0x0a, 0xc4, 0x00, 0x00, 0x01]),
//!     transport.clone(),
//!     DoubleBufferStore::new(MemoryMedium::new()),
//! )?;
//!
//! // Reported by the mesh stack
//! node.handle(ProvisioningEvent::RegistrationComplete { result: 0 }.into())?;
//! node.handle(ProvisioningEvent::Complete(ProvisionInfo {
//!     net_index: NetKeyIndex::new(0)?,
//!     address: UnicastAddress::new(0x0005)?,
//!     flags: 0,
//!     iv_index: IvIndex(0),
//! }).into())?;
//!
//! // Set by the configurator
//! let client = node.composition().handle(ModelId::GENERIC_ONOFF_CLIENT).unwrap();
//! transport.set_publication(client, Address::from_raw(0xC000));
//!
//! // The switch was pressed
//! node.handle(NodeEvent::Trigger)?;
//! assert_eq!(transport.sent()[0].payload, vec![0x01, 0x00]);
//! # Ok(())
//! # }
//! ```
//!
//! For an event loop on tokio, see [`runtime`].

pub mod command;
pub mod composition;
pub mod config;
pub mod configuration;
pub mod error;
pub mod event;
pub mod identity;
pub mod node;
pub mod provisioning;
pub mod publisher;
pub mod runtime;
pub mod store;
pub mod transport;
pub mod types;

pub use composition::{Composition, ModelHandle};
pub use config::{NodeConfig, RetryPolicy, StorageConfig};
pub use error::{ConfigError, Error, Result, StorageError, TransportError, ValueError};
pub use identity::DeviceIdentity;
pub use node::{EventOutcome, Node};
pub use runtime::NodeHandle;
pub use store::SessionRecord;
