// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event loop for a [`Node`].
//!
//! [`spawn`] moves the node into a tokio task that handles queued
//! [`NodeEvent`]s one at a time. The switch driver and the mesh stack glue
//! post events through cloneable [`NodeHandle`]s. Delayed resends are timer
//! tasks that post [`NodeEvent::RetryDue`] back into the queue, so the loop
//! itself never waits.
//!
//! The loop ends when every handle is dropped, returning the node, or on a
//! fatal initialization error.
//!
//! # Examples
//!
//! ```
//! use mesh_switch::{DeviceIdentity, Node, NodeConfig, runtime};
//! use mesh_switch::event::NodeNotification;
//! use mesh_switch::provisioning::ProvisioningEvent;
//! use mesh_switch::store::{DoubleBufferStore, MemoryMedium};
//! use mesh_switch::transport::LoopbackTransport;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> mesh_switch::Result<()> {
//! let node = Node::start(
//!     NodeConfig::default(),
//!     DeviceIdentity::random(),
//!     LoopbackTransport::new(),
//!     DoubleBufferStore::new(MemoryMedium::new()),
//! )?;
//!
//! let (handle, task) = runtime::spawn(node);
//! let mut notifications = handle.subscribe();
//!
//! handle
//!     .deliver(ProvisioningEvent::RegistrationComplete { result: 0 })
//!     .await?;
//! assert!(matches!(
//!     notifications.recv().await,
//!     Ok(NodeNotification::ProvisioningChanged { .. })
//! ));
//!
//! drop(handle);
//! let node = task.await.expect("node task panicked")?;
//! assert!(!node.is_provisioned());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::event::{NodeEvent, NodeNotification, NotificationBus};
use crate::node::{EventOutcome, Node};
use crate::store::SessionStore;
use crate::transport::MeshTransport;

/// Posts events to a running node.
#[derive(Debug, Clone)]
pub struct NodeHandle {
    events: mpsc::Sender<NodeEvent>,
    notifications: NotificationBus,
}

impl NodeHandle {
    /// Reports a switch activation.
    ///
    /// # Errors
    ///
    /// Returns `Error::NodeStopped` if the event loop has ended.
    pub async fn trigger(&self) -> Result<()> {
        self.deliver(NodeEvent::Trigger).await
    }

    /// Queues an event, waiting for room if the queue is full.
    ///
    /// # Errors
    ///
    /// Returns `Error::NodeStopped` if the event loop has ended.
    pub async fn deliver(&self, event: impl Into<NodeEvent>) -> Result<()> {
        self.events
            .send(event.into())
            .await
            .map_err(|_| Error::NodeStopped)
    }

    /// Queues an event from a thread outside the runtime, such as a mesh
    /// stack callback.
    ///
    /// # Errors
    ///
    /// Returns `Error::NodeStopped` if the event loop has ended.
    ///
    /// # Panics
    ///
    /// Panics if called from within an async context.
    pub fn blocking_deliver(&self, event: impl Into<NodeEvent>) -> Result<()> {
        self.events
            .blocking_send(event.into())
            .map_err(|_| Error::NodeStopped)
    }

    /// Subscribes to the node's notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<NodeNotification> {
        self.notifications.subscribe()
    }

    /// Returns `true` while the event loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.events.is_closed()
    }
}

/// Starts the event loop for `node`.
///
/// The queue holds `event_capacity` events from the node's configuration.
/// The task resolves to the node once every [`NodeHandle`] is dropped, or to
/// the error that stopped it.
#[must_use = "dropping the handle stops the node"]
pub fn spawn<T, S>(node: Node<T, S>) -> (NodeHandle, JoinHandle<Result<Node<T, S>>>)
where
    T: MeshTransport + Send + 'static,
    S: SessionStore + Send + 'static,
{
    let (tx, rx) = mpsc::channel(node.config().event_capacity);
    let handle = NodeHandle {
        events: tx.clone(),
        notifications: node.notifications().clone(),
    };

    // Timers hold only a weak sender so they do not keep the loop alive
    let timers = tx.downgrade();
    drop(tx);

    let task = tokio::spawn(run(node, rx, timers));
    (handle, task)
}

async fn run<T, S>(
    mut node: Node<T, S>,
    mut events: mpsc::Receiver<NodeEvent>,
    timers: mpsc::WeakSender<NodeEvent>,
) -> Result<Node<T, S>>
where
    T: MeshTransport,
    S: SessionStore,
{
    tracing::debug!(uuid = %node.identity(), "Node event loop started");

    while let Some(event) = events.recv().await {
        let kind = event.kind();
        match node.handle(event) {
            Ok(EventOutcome::RetryScheduled(delay)) => schedule_retry(&timers, delay),
            Ok(outcome) => tracing::trace!(kind, ?outcome, "Event handled"),
            Err(err @ Error::Initialization { .. }) => {
                tracing::error!(kind, error = %err, "Node initialization failed, stopping");
                return Err(err);
            }
            Err(err) => tracing::warn!(kind, error = %err, "Event handling failed"),
        }
    }

    tracing::debug!("Node event loop stopped");
    Ok(node)
}

fn schedule_retry(timers: &mpsc::WeakSender<NodeEvent>, delay: Duration) {
    let timers = timers.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Some(events) = timers.upgrade() {
            // A closed queue means the node is gone
            let _ = events.send(NodeEvent::RetryDue).await;
        }
    });
}
