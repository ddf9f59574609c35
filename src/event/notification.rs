// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outbound notifications.

use std::time::Duration;

use crate::configuration::ConfigurationEvent;
use crate::error::TransportError;
use crate::provisioning::ProvisioningState;
use crate::store::SessionRecord;

/// Something observers of the node may want to know about.
///
/// Commissioning tools and status indicators subscribe through
/// [`NotificationBus`](super::NotificationBus).
#[derive(Debug, Clone, PartialEq)]
pub enum NodeNotification {
    /// The provisioning state changed.
    ProvisioningChanged {
        /// Previous state.
        from: ProvisioningState,
        /// New state.
        to: ProvisioningState,
    },
    /// A configuration change was recorded.
    ConfigurationRecorded(ConfigurationEvent),
    /// A toggle command was handed to the transport.
    Published {
        /// Transaction id carried by the command.
        transaction_id: u8,
        /// On/off value carried by the command.
        on_off: bool,
        /// Whether this was a resend after a timeout.
        resend: bool,
    },
    /// A toggle command could not be handed off.
    PublishFailed {
        /// The transport error.
        error: TransportError,
    },
    /// The session record could not be saved after a publish. The in-memory
    /// session is ahead of storage until the next successful save.
    PersistFailed {
        /// The record that was not saved.
        record: SessionRecord,
        /// Storage error description.
        reason: String,
    },
    /// A resend was scheduled after a delay.
    RetryScheduled {
        /// Resend number, starting at 1.
        attempt: u32,
        /// Delay before the resend.
        delay: Duration,
    },
    /// The retry policy allows no more resends.
    RetryExhausted {
        /// Resends performed.
        attempts: u32,
    },
    /// Session state loaded from storage.
    SessionRestored {
        /// The session now in use.
        record: SessionRecord,
        /// `false` if defaults were used.
        from_storage: bool,
    },
}

impl NodeNotification {
    /// Returns `true` for notifications about a failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::PublishFailed { .. } | Self::PersistFailed { .. } | Self::RetryExhausted { .. }
        )
    }

    /// Returns `true` for publish notifications.
    #[must_use]
    pub fn is_publish(&self) -> bool {
        matches!(self, Self::Published { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let published = NodeNotification::Published {
            transaction_id: 1,
            on_off: true,
            resend: false,
        };
        assert!(published.is_publish());
        assert!(!published.is_failure());

        let failed = NodeNotification::PublishFailed {
            error: TransportError::NotProvisioned,
        };
        assert!(failed.is_failure());
        assert!(NodeNotification::RetryExhausted { attempts: 3 }.is_failure());
    }
}
