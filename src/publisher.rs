// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Toggle publishing with resend on acknowledgment timeout.
//!
//! Each publish takes the next transaction id, sends the current on/off value
//! unacknowledged to the client's publication address, then flips the value
//! and saves the session. A send that cannot be handed off changes neither
//! the on/off value nor storage.
//!
//! A timeout for the acknowledged on/off set starts a resend with a fresh
//! transaction id. [`RetryPolicy`] decides whether and when. Once the policy
//! is exhausted, further timeouts are refused until a fresh publish or an
//! acknowledgment.

use std::time::Duration;

use crate::command::OnOffCommand;
use crate::composition::ModelHandle;
use crate::config::RetryPolicy;
use crate::error::{StorageError, TransportError};
use crate::store::{SessionRecord, SessionStore};
use crate::transport::MeshTransport;
use crate::types::{Address, Opcode};

/// Result of a command handed to the transport.
#[derive(Debug)]
pub struct PublishReport {
    /// Transaction id carried by the command.
    pub transaction_id: u8,
    /// On/off value carried by the command.
    pub on_off: bool,
    /// Where the command was published.
    pub destination: Address,
    /// Whether this was a resend after a timeout.
    pub resend: bool,
    /// Set if the session could not be saved afterwards.
    pub persist_error: Option<StorageError>,
}

impl PublishReport {
    /// Returns `true` if the new session was saved.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.persist_error.is_none()
    }
}

/// What to do about an acknowledgment timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Resend immediately.
    ResendNow,
    /// Resend once the delay has elapsed.
    ResendAfter(Duration),
    /// The policy allows no more resends.
    Exhausted {
        /// Resends performed before giving up.
        attempts: u32,
    },
    /// The timeout is not for an on/off set.
    Ignored,
}

/// Owns the session state and publishes toggle commands.
///
/// # Examples
///
/// ```
/// use mesh_switch::Composition;
/// use mesh_switch::config::RetryPolicy;
/// use mesh_switch::identity::DeviceIdentity;
/// use mesh_switch::publisher::CommandPublisher;
/// use mesh_switch::store::{DoubleBufferStore, MemoryMedium, SessionRecord, SessionStore};
/// use mesh_switch::transport::{LoopbackTransport, MeshTransport};
/// use mesh_switch::types::{Address, ModelId};
///
/// let comp = Composition::switch_node();
/// let client = comp.handle(ModelId::GENERIC_ONOFF_CLIENT).unwrap();
///
/// let mut transport = LoopbackTransport::new();
/// transport.initialize(&DeviceIdentity::random(), &comp).unwrap();
/// transport.set_publication(client, Address::from_raw(0xC000));
/// let mut store = DoubleBufferStore::new(MemoryMedium::new());
///
/// let mut publisher = CommandPublisher::new(client, RetryPolicy::default());
/// publisher.prime(SessionRecord::new(5, true));
///
/// let report = publisher.request_toggle(&mut transport, &mut store, true).unwrap();
/// assert_eq!(report.transaction_id, 6);
/// assert_eq!(transport.sent()[0].payload, vec![0x06, 0x01]);
/// assert_eq!(store.restore().unwrap(), Some(SessionRecord::new(6, false)));
/// ```
#[derive(Debug, Clone)]
pub struct CommandPublisher {
    model: ModelHandle,
    session: SessionRecord,
    policy: RetryPolicy,
    attempts: u32,
    pending: u32,
}

impl CommandPublisher {
    /// Creates a publisher for `model` starting from the default session.
    #[must_use]
    pub fn new(model: ModelHandle, policy: RetryPolicy) -> Self {
        Self {
            model,
            session: SessionRecord::default(),
            policy,
            attempts: 0,
            pending: 0,
        }
    }

    /// Current session: last transaction id and the next on/off value.
    #[must_use]
    pub fn session(&self) -> SessionRecord {
        self.session
    }

    /// Replaces the session, e.g. with a restored record.
    pub fn prime(&mut self, record: SessionRecord) {
        self.session = record;
    }

    /// Resends performed since the last fresh publish or acknowledgment.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Returns `true` while a delayed resend is waiting.
    #[must_use]
    pub fn is_retry_pending(&self) -> bool {
        self.pending > 0
    }

    /// Delayed resends scheduled but not yet due.
    #[must_use]
    pub fn pending_retries(&self) -> u32 {
        self.pending
    }

    /// Publishes a toggle.
    ///
    /// Starts a new command, so the resend counter is reset and any delayed
    /// resends are dropped.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::NotProvisioned` or `NoDestination` without
    /// sending anything, or the transport's error if the hand-off failed.
    pub fn request_toggle<T, S>(
        &mut self,
        transport: &mut T,
        store: &mut S,
        provisioned: bool,
    ) -> Result<PublishReport, TransportError>
    where
        T: MeshTransport,
        S: SessionStore + ?Sized,
    {
        self.attempts = 0;
        self.pending = 0;
        self.publish(transport, store, provisioned, false)
    }

    /// Publishes a toggle as a resend, keeping the resend counter.
    ///
    /// # Errors
    ///
    /// Same as [`request_toggle`](Self::request_toggle).
    pub fn resend<T, S>(
        &mut self,
        transport: &mut T,
        store: &mut S,
        provisioned: bool,
    ) -> Result<PublishReport, TransportError>
    where
        T: MeshTransport,
        S: SessionStore + ?Sized,
    {
        self.publish(transport, store, provisioned, true)
    }

    /// Decides how to react to an acknowledgment timeout for `opcode`.
    ///
    /// Every accepted timeout counts as one attempt. With a delay, each one
    /// adds a pending resend, so overlapping timeouts each get their own.
    /// After `Exhausted` the counter stays at the limit.
    pub fn on_timeout(&mut self, opcode: Opcode) -> RetryDecision {
        if opcode != Opcode::GENERIC_ONOFF_SET {
            tracing::debug!(%opcode, "Ignoring timeout for other opcode");
            return RetryDecision::Ignored;
        }

        if !self.policy.should_retry(self.attempts) {
            tracing::warn!(
                attempts = self.attempts,
                "Giving up after acknowledgment timeouts"
            );
            return RetryDecision::Exhausted {
                attempts: self.attempts,
            };
        }

        let delay = self.policy.delay_for_attempt(self.attempts);
        self.attempts = self.attempts.saturating_add(1);

        if delay.is_zero() {
            tracing::info!(attempt = self.attempts, "Acknowledgment timeout, resending");
            RetryDecision::ResendNow
        } else {
            self.pending = self.pending.saturating_add(1);
            tracing::info!(
                attempt = self.attempts,
                pending = self.pending,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Acknowledgment timeout, resend scheduled"
            );
            RetryDecision::ResendAfter(delay)
        }
    }

    /// Consumes one pending delayed resend. Returns `false` if there is none.
    pub fn take_due_retry(&mut self) -> bool {
        if self.pending == 0 {
            return false;
        }
        self.pending -= 1;
        true
    }

    /// Records an acknowledgment: resets the resend counter and drops
    /// pending resends.
    pub fn acknowledge(&mut self) {
        self.attempts = 0;
        self.pending = 0;
    }

    fn publish<T, S>(
        &mut self,
        transport: &mut T,
        store: &mut S,
        provisioned: bool,
        resend: bool,
    ) -> Result<PublishReport, TransportError>
    where
        T: MeshTransport,
        S: SessionStore + ?Sized,
    {
        if !provisioned {
            tracing::warn!("Cannot publish, node is not provisioned");
            return Err(TransportError::NotProvisioned);
        }
        let Some(destination) = transport.publication(self.model) else {
            tracing::warn!(model = %self.model.model, "Cannot publish, no publication address");
            return Err(TransportError::NoDestination);
        };

        // The id is consumed even if the hand-off fails
        self.session.transaction_id = self.session.transaction_id.wrapping_add(1);
        let SessionRecord {
            transaction_id,
            on_off,
        } = self.session;

        let command = OnOffCommand::set_unacknowledged(transaction_id, on_off);
        if let Err(err) = transport.send_message(self.model, &command) {
            tracing::error!(tid = transaction_id, error = %err, "Failed to send generic on/off set");
            return Err(err);
        }
        tracing::info!(tid = transaction_id, on_off, %destination, resend, "Published on/off set");

        self.session.on_off = !on_off;
        let persist_error = store.store(self.session).err();
        if let Some(err) = &persist_error {
            tracing::warn!(
                tid = self.session.transaction_id,
                on_off = self.session.on_off,
                error = %err,
                "Failed to save session, storage is behind"
            );
        }

        Ok(PublishReport {
            transaction_id,
            on_off,
            destination,
            resend,
            persist_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::Composition;
    use crate::identity::DeviceIdentity;
    use crate::store::{DoubleBufferStore, MemoryMedium};
    use crate::transport::LoopbackTransport;
    use crate::types::ModelId;

    struct Fixture {
        transport: LoopbackTransport,
        medium: MemoryMedium,
        store: DoubleBufferStore<MemoryMedium>,
        publisher: CommandPublisher,
    }

    impl Fixture {
        fn new(policy: RetryPolicy) -> Self {
            let comp = Composition::switch_node();
            let client = comp.handle(ModelId::GENERIC_ONOFF_CLIENT).unwrap();

            let mut transport = LoopbackTransport::new();
            transport
                .initialize(&DeviceIdentity::random(), &comp)
                .unwrap();
            transport.set_publication(client, Address::from_raw(0xC000));

            let medium = MemoryMedium::new();
            Self {
                transport,
                store: DoubleBufferStore::new(medium.clone()),
                medium,
                publisher: CommandPublisher::new(client, policy),
            }
        }

        fn toggle(&mut self) -> Result<PublishReport, TransportError> {
            self.publisher
                .request_toggle(&mut self.transport, &mut self.store, true)
        }

        fn resend(&mut self) -> Result<PublishReport, TransportError> {
            self.publisher
                .resend(&mut self.transport, &mut self.store, true)
        }

        fn sent_payloads(&self) -> Vec<Vec<u8>> {
            self.transport
                .sent()
                .into_iter()
                .map(|m| m.payload)
                .collect()
        }
    }

    #[test]
    fn triggered_publish_sends_and_persists() {
        let mut fx = Fixture::new(RetryPolicy::default());
        fx.publisher.prime(SessionRecord::new(5, true));

        let report = fx.toggle().unwrap();

        assert_eq!(report.transaction_id, 6);
        assert!(report.on_off);
        assert!(report.is_persisted());
        assert_eq!(fx.sent_payloads(), vec![vec![0x06, 0x01]]);
        assert_eq!(
            fx.transport.sent()[0].opcode,
            Opcode::GENERIC_ONOFF_SET_UNACK
        );
        assert_eq!(fx.publisher.session(), SessionRecord::new(6, false));
        assert_eq!(fx.store.restore().unwrap(), Some(SessionRecord::new(6, false)));
    }

    #[test]
    fn first_boot_defaults() {
        let mut fx = Fixture::new(RetryPolicy::default());
        assert_eq!(fx.store.restore().unwrap(), None);

        fx.toggle().unwrap();
        assert_eq!(fx.sent_payloads(), vec![vec![0x01, 0x00]]);
    }

    #[test]
    fn timeout_resends_with_next_tid() {
        let mut fx = Fixture::new(RetryPolicy::default());
        fx.publisher.prime(SessionRecord::new(9, false));
        fx.toggle().unwrap();
        fx.transport.take_sent();

        assert_eq!(
            fx.publisher.on_timeout(Opcode::GENERIC_ONOFF_SET),
            RetryDecision::ResendNow
        );
        let report = fx.resend().unwrap();

        assert!(report.resend);
        let sent = fx.sent_payloads();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0][0], 11);
        assert!(sent.iter().all(|p| p[0] != 10));
    }

    #[test]
    fn unprovisioned_publish_is_rejected() {
        let mut fx = Fixture::new(RetryPolicy::default());
        fx.publisher.prime(SessionRecord::new(3, true));

        let err = fx
            .publisher
            .request_toggle(&mut fx.transport, &mut fx.store, false)
            .unwrap_err();

        assert_eq!(err, TransportError::NotProvisioned);
        assert!(fx.transport.sent().is_empty());
        assert_eq!(fx.medium.write_count(), 0);
        assert_eq!(fx.publisher.session(), SessionRecord::new(3, true));
    }

    #[test]
    fn missing_publication_is_rejected() {
        let mut fx = Fixture::new(RetryPolicy::default());
        let client = Composition::switch_node()
            .handle(ModelId::GENERIC_ONOFF_CLIENT)
            .unwrap();
        fx.transport.set_publication(client, None);

        assert_eq!(fx.toggle().unwrap_err(), TransportError::NoDestination);
        assert_eq!(fx.publisher.session(), SessionRecord::default());
        assert_eq!(fx.medium.write_count(), 0);
    }

    #[test]
    fn tid_is_monotonic_and_wraps() {
        let mut fx = Fixture::new(RetryPolicy::default());
        fx.publisher.prime(SessionRecord::new(253, false));

        for _ in 0..4 {
            fx.toggle().unwrap();
        }
        fx.publisher.on_timeout(Opcode::GENERIC_ONOFF_SET);
        fx.resend().unwrap();

        let tids: Vec<u8> = fx.sent_payloads().iter().map(|p| p[0]).collect();
        assert_eq!(tids, vec![254, 255, 0, 1, 2]);
    }

    #[test]
    fn on_off_alternates() {
        let mut fx = Fixture::new(RetryPolicy::default());

        let values: Vec<bool> = (0..4).map(|_| fx.toggle().unwrap().on_off).collect();
        assert_eq!(values, vec![false, true, false, true]);
    }

    #[test]
    fn failed_handoff_does_not_flip_or_persist() {
        let mut fx = Fixture::new(RetryPolicy::default());
        fx.publisher.prime(SessionRecord::new(1, true));
        fx.transport
            .fail_next_send(TransportError::SendRejected("queue full".into()));

        let err = fx.toggle().unwrap_err();

        assert!(matches!(err, TransportError::SendRejected(_)));
        assert!(fx.publisher.session().on_off);
        assert_eq!(fx.medium.write_count(), 0);

        // The next publish still carries the unflipped value
        fx.toggle().unwrap();
        assert_eq!(fx.sent_payloads(), vec![vec![0x03, 0x01]]);
    }

    #[test]
    fn persist_failure_keeps_in_memory_toggle() {
        let mut fx = Fixture::new(RetryPolicy::default());
        fx.publisher.prime(SessionRecord::new(1, false));
        fx.medium.set_fail_writes(true);

        let report = fx.toggle().unwrap();

        assert!(!report.is_persisted());
        assert!(matches!(
            report.persist_error,
            Some(StorageError::WriteFailed(_))
        ));
        assert_eq!(fx.publisher.session(), SessionRecord::new(2, true));
    }

    #[test]
    fn other_opcode_timeouts_are_ignored() {
        let mut fx = Fixture::new(RetryPolicy::default());
        assert_eq!(
            fx.publisher.on_timeout(Opcode::GENERIC_ONOFF_GET),
            RetryDecision::Ignored
        );
        assert_eq!(fx.publisher.attempts(), 0);
    }

    #[test]
    fn bounded_policy_exhausts() {
        let mut fx = Fixture::new(RetryPolicy::new().with_max_retries(2));
        fx.toggle().unwrap();

        assert_eq!(
            fx.publisher.on_timeout(Opcode::GENERIC_ONOFF_SET),
            RetryDecision::ResendNow
        );
        fx.resend().unwrap();
        assert_eq!(
            fx.publisher.on_timeout(Opcode::GENERIC_ONOFF_SET),
            RetryDecision::ResendNow
        );
        fx.resend().unwrap();
        assert_eq!(
            fx.publisher.on_timeout(Opcode::GENERIC_ONOFF_SET),
            RetryDecision::Exhausted { attempts: 2 }
        );
        assert_eq!(fx.publisher.attempts(), 2);
    }

    #[test]
    fn exhausted_policy_stays_exhausted() {
        let mut fx = Fixture::new(RetryPolicy::new().with_max_retries(1));
        fx.toggle().unwrap();

        let mut resends = 0;
        for _ in 0..6 {
            match fx.publisher.on_timeout(Opcode::GENERIC_ONOFF_SET) {
                RetryDecision::ResendNow => {
                    fx.resend().unwrap();
                    resends += 1;
                }
                decision => assert_eq!(decision, RetryDecision::Exhausted { attempts: 1 }),
            }
        }

        assert_eq!(resends, 1);
        assert_eq!(fx.transport.sent().len(), 2);

        // A fresh publish starts a new round
        fx.toggle().unwrap();
        assert_eq!(
            fx.publisher.on_timeout(Opcode::GENERIC_ONOFF_SET),
            RetryDecision::ResendNow
        );
    }

    #[test]
    fn overlapping_timeouts_each_get_a_resend() {
        let policy = RetryPolicy::new()
            .with_initial_delay(Duration::from_millis(100))
            .with_max_retries(3);
        let mut fx = Fixture::new(policy);
        fx.toggle().unwrap();

        for _ in 0..2 {
            assert!(matches!(
                fx.publisher.on_timeout(Opcode::GENERIC_ONOFF_SET),
                RetryDecision::ResendAfter(_)
            ));
        }
        assert_eq!(fx.publisher.pending_retries(), 2);

        assert!(fx.publisher.take_due_retry());
        fx.resend().unwrap();
        assert!(fx.publisher.take_due_retry());
        fx.resend().unwrap();
        assert!(!fx.publisher.take_due_retry());

        assert_eq!(fx.publisher.attempts(), 2);
        assert_eq!(fx.sent_payloads()[1..], [vec![2, 1], vec![3, 0]]);
    }

    #[test]
    fn disabled_policy_never_resends() {
        let mut fx = Fixture::new(RetryPolicy::disabled());
        assert_eq!(
            fx.publisher.on_timeout(Opcode::GENERIC_ONOFF_SET),
            RetryDecision::Exhausted { attempts: 0 }
        );
    }

    #[test]
    fn backoff_schedules_delayed_resend() {
        let policy = RetryPolicy::new()
            .with_initial_delay(Duration::from_millis(100))
            .with_backoff_multiplier(2.0)
            .with_max_delay(Duration::from_secs(1));
        let mut fx = Fixture::new(policy);

        assert_eq!(
            fx.publisher.on_timeout(Opcode::GENERIC_ONOFF_SET),
            RetryDecision::ResendAfter(Duration::from_millis(100))
        );
        assert!(fx.publisher.is_retry_pending());
        assert!(fx.publisher.take_due_retry());
        assert!(!fx.publisher.take_due_retry());

        assert_eq!(
            fx.publisher.on_timeout(Opcode::GENERIC_ONOFF_SET),
            RetryDecision::ResendAfter(Duration::from_millis(200))
        );
    }

    #[test]
    fn fresh_publish_and_ack_reset_attempts() {
        let policy = RetryPolicy::new().with_initial_delay(Duration::from_millis(50));
        let mut fx = Fixture::new(policy);

        fx.publisher.on_timeout(Opcode::GENERIC_ONOFF_SET);
        assert_eq!(fx.publisher.attempts(), 1);
        fx.toggle().unwrap();
        assert_eq!(fx.publisher.attempts(), 0);
        assert!(!fx.publisher.is_retry_pending());

        fx.publisher.on_timeout(Opcode::GENERIC_ONOFF_SET);
        fx.publisher.acknowledge();
        assert_eq!(fx.publisher.attempts(), 0);
        assert!(!fx.publisher.take_due_retry());
    }
}
