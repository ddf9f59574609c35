// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broadcast channel for node notifications.

use tokio::sync::broadcast;

use super::NodeNotification;

/// Default channel capacity.
const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Broadcasts [`NodeNotification`]s to any number of subscribers.
///
/// A subscriber that falls more than the capacity behind loses the oldest
/// notifications and receives `RecvError::Lagged`. Publishing never blocks
/// the node.
///
/// # Examples
///
/// ```
/// use mesh_switch::event::{NodeNotification, NotificationBus};
///
/// let bus = NotificationBus::new();
/// let mut rx = bus.subscribe();
///
/// bus.publish(NodeNotification::RetryExhausted { attempts: 3 });
/// assert!(rx.try_recv().unwrap().is_failure());
/// ```
#[derive(Debug, Clone)]
pub struct NotificationBus {
    sender: broadcast::Sender<NodeNotification>,
}

impl NotificationBus {
    /// Creates a bus with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a bus buffering up to `capacity` notifications per subscriber.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. [`NodeConfig::validate`](crate::config::NodeConfig::validate)
    /// rejects that value.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to notifications published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<NodeNotification> {
        self.sender.subscribe()
    }

    /// Number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publishes to all subscribers. Dropped if there are none.
    pub fn publish(&self, notification: NodeNotification) {
        // No subscribers is fine
        let _ = self.sender.send(notification);
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}
