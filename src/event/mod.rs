// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Events in and notifications out.
//!
//! Every stimulus the node reacts to, whether the switch, the mesh stack or
//! a retry timer, arrives as a [`NodeEvent`] and is handled one at a time.
//! What the node did is broadcast as [`NodeNotification`]s on a
//! [`NotificationBus`].
//!
//! # Examples
//!
//! ```
//! use mesh_switch::event::{NodeNotification, NotificationBus};
//! use mesh_switch::store::SessionRecord;
//!
//! let bus = NotificationBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.publish(NodeNotification::SessionRestored {
//!     record: SessionRecord::default(),
//!     from_storage: false,
//! });
//! assert!(rx.try_recv().is_ok());
//! ```

mod event_bus;
mod node_event;
mod notification;

pub use event_bus::NotificationBus;
pub use node_event::{GenericClientEvent, NodeEvent};
pub use notification::NodeNotification;
