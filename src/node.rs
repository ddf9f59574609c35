// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The switch node.
//!
//! [`Node`] owns everything with state: the provisioning machine, the
//! configuration filter, the publisher and its session, the transport and the
//! store. Events are handled one at a time through [`Node::handle`], either
//! directly or from the task started by [`runtime::spawn`](crate::runtime::spawn).
//!
//! # Startup
//!
//! [`Node::start`] restores the session from storage (a failure falls back to
//! the defaults and is retried once the node is provisioned), then registers
//! the identity and composition with the mesh stack. Once the stack reports
//! registration complete, the node enables provisioning on the configured
//! bearers and sets the advertised name.
//!
//! # Examples
//!
//! ```
//! use mesh_switch::{DeviceIdentity, Node, NodeConfig};
//! use mesh_switch::event::NodeEvent;
//! use mesh_switch::node::EventOutcome;
//! use mesh_switch::provisioning::ProvisioningEvent;
//! use mesh_switch::store::{DoubleBufferStore, MemoryMedium};
//! use mesh_switch::transport::LoopbackTransport;
//!
//! # fn main() -> mesh_switch::Result<()> {
//! let transport = LoopbackTransport::new();
//! let store = DoubleBufferStore::new(MemoryMedium::new());
//! let mut node = Node::start(NodeConfig::default(), DeviceIdentity::random(), transport, store)?;
//!
//! let outcome = node.handle(ProvisioningEvent::RegistrationComplete { result: 0 }.into())?;
//! assert_eq!(outcome, EventOutcome::Applied);
//!
//! // Not provisioned yet, so the switch has nothing to publish to
//! assert!(node.handle(NodeEvent::Trigger).is_err());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use crate::composition::Composition;
use crate::config::NodeConfig;
use crate::configuration::{ConfigAction, ConfigurationFilter, ConfigurationSnapshot};
use crate::error::{ConfigError, Error, Result, TransportError};
use crate::event::{GenericClientEvent, NodeEvent, NodeNotification, NotificationBus};
use crate::identity::DeviceIdentity;
use crate::provisioning::{ProvisioningEvent, ProvisioningMachine, ProvisioningState, Transition};
use crate::publisher::{CommandPublisher, RetryDecision};
use crate::store::{SessionRecord, SessionStore};
use crate::transport::MeshTransport;
use crate::types::ModelId;

/// What handling an event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// The event was applied or recorded.
    Applied,
    /// A toggle command was handed to the transport and saved.
    Published {
        /// Transaction id carried by the command.
        transaction_id: u8,
        /// On/off value carried by the command.
        on_off: bool,
        /// Whether this was a resend after a timeout.
        resend: bool,
    },
    /// A resend is due after the delay; the caller posts
    /// [`NodeEvent::RetryDue`] when it elapses.
    RetryScheduled(Duration),
    /// The event is not relevant in the current state.
    Ignored,
}

/// A mesh switch node.
pub struct Node<T, S> {
    config: NodeConfig,
    identity: DeviceIdentity,
    composition: Composition,
    transport: T,
    store: S,
    provisioning: ProvisioningMachine,
    configuration: ConfigurationFilter,
    publisher: CommandPublisher,
    notifications: NotificationBus,
    restored: bool,
    session_advanced: bool,
}

impl<T, S> std::fmt::Debug for Node<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("identity", &self.identity)
            .field("state", self.provisioning.state())
            .field("session", &self.publisher.session())
            .field("restored", &self.restored)
            .finish_non_exhaustive()
    }
}

impl<T: MeshTransport, S: SessionStore> Node<T, S> {
    /// Restores the session and registers the node with the mesh stack.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `config` is invalid and
    /// `Error::Initialization` if the stack refuses the registration. Storage
    /// failures are not errors here.
    pub fn start(
        config: NodeConfig,
        identity: DeviceIdentity,
        mut transport: T,
        store: S,
    ) -> Result<Self> {
        config.validate()?;

        let composition = Composition::switch_node();
        let client = composition
            .handle(ModelId::GENERIC_ONOFF_CLIENT)
            .ok_or_else(|| {
                ConfigError::Invalid("composition has no generic on/off client".into())
            })?;

        tracing::info!(uuid = %identity, "Registering with mesh stack");
        transport
            .initialize(&identity, &composition)
            .map_err(|source| Error::Initialization {
                stage: "initialize",
                source,
            })?;

        let mut node = Self {
            notifications: NotificationBus::with_capacity(config.notification_capacity),
            publisher: CommandPublisher::new(client, config.retry.clone()),
            config,
            identity,
            composition,
            transport,
            store,
            provisioning: ProvisioningMachine::new(),
            configuration: ConfigurationFilter::new(ModelId::GENERIC_ONOFF_CLIENT),
            restored: false,
            session_advanced: false,
        };
        node.restore_session();
        Ok(node)
    }

    /// Handles one event.
    ///
    /// # Errors
    ///
    /// - `Error::Initialization` if the stack reports a failed registration
    ///   or provisioning enable. The node cannot operate after this.
    /// - `Error::Transport` if a publish could not be attempted or handed off.
    /// - `Error::Storage` if a publish succeeded but the session could not be
    ///   saved. The in-memory session keeps the new value.
    pub fn handle(&mut self, event: NodeEvent) -> Result<EventOutcome> {
        tracing::trace!(kind = event.kind(), ?event, "Handling event");

        match event {
            NodeEvent::Trigger => self.publish(false),
            NodeEvent::Provisioning(event) => self.on_provisioning(&event),
            NodeEvent::Configuration(event) => match self.configuration.handle(&event) {
                ConfigAction::PublishToggle => {
                    self.notifications
                        .publish(NodeNotification::ConfigurationRecorded(event));
                    self.publish(false)
                }
                ConfigAction::Recorded => {
                    self.notifications
                        .publish(NodeNotification::ConfigurationRecorded(event));
                    Ok(EventOutcome::Applied)
                }
                ConfigAction::Ignored => Ok(EventOutcome::Ignored),
            },
            NodeEvent::GenericClient(event) => self.on_generic_client(event),
            NodeEvent::RetryDue => {
                if self.publisher.take_due_retry() && self.is_provisioned() {
                    self.publish(true)
                } else {
                    tracing::debug!("No resend pending");
                    Ok(EventOutcome::Ignored)
                }
            }
        }
    }

    fn on_provisioning(&mut self, event: &ProvisioningEvent) -> Result<EventOutcome> {
        match (*event, self.provisioning.state()) {
            (ProvisioningEvent::RegistrationComplete { result }, ProvisioningState::Unregistered)
                if result != 0 =>
            {
                tracing::error!(result, "Mesh registration failed");
                return Err(stack_failure("registration", result, "mesh registration"));
            }
            (ProvisioningEvent::ProvisioningEnabled { result }, ProvisioningState::Registered)
                if result != 0 =>
            {
                tracing::error!(result, "Enabling provisioning failed");
                return Err(stack_failure(
                    "enable provisioning",
                    result,
                    "provisioning enable",
                ));
            }
            _ => {}
        }

        let (from, to) = match self.provisioning.apply(event) {
            Transition::Changed { from, to } => (from, to),
            Transition::Unchanged => return Ok(EventOutcome::Applied),
            Transition::Ignored => return Ok(EventOutcome::Ignored),
        };
        self.notifications
            .publish(NodeNotification::ProvisioningChanged { from, to });

        match to {
            ProvisioningState::Registered => self.advertise()?,
            ProvisioningState::Provisioned(_) => {
                // Storage is only behind memory once a publish has run
                if !self.restored && !self.session_advanced {
                    self.restore_session();
                }
            }
            ProvisioningState::Unregistered => {
                // Session is kept, the next network continues the tid sequence
                self.configuration.reset();
                self.publisher.acknowledge();
            }
            ProvisioningState::LinkOpen(_) | ProvisioningState::LinkClosed(_) => {}
        }
        Ok(EventOutcome::Applied)
    }

    fn advertise(&mut self) -> Result<()> {
        tracing::info!(
            adv = self.config.bearers.advertising,
            gatt = self.config.bearers.gatt,
            "Enabling provisioning"
        );
        self.transport
            .enable_provisioning(self.config.bearers)
            .map_err(|source| Error::Initialization {
                stage: "enable provisioning",
                source,
            })?;

        if let Some(name) = &self.config.device_name
            && let Err(err) = self.transport.set_unprovisioned_name(name)
        {
            tracing::warn!(name = %name, error = %err, "Failed to set device name");
        }
        Ok(())
    }

    fn on_generic_client(&mut self, event: GenericClientEvent) -> Result<EventOutcome> {
        match event {
            GenericClientEvent::GetState { opcode, present } if opcode.is_generic_onoff() => {
                tracing::info!(%opcode, present, "Generic on/off status");
                Ok(EventOutcome::Applied)
            }
            GenericClientEvent::SetState { opcode, present } if opcode.is_generic_onoff() => {
                tracing::info!(%opcode, present, "Generic on/off set acknowledged");
                self.publisher.acknowledge();
                Ok(EventOutcome::Applied)
            }
            GenericClientEvent::Publish { opcode } => {
                tracing::info!(%opcode, "Generic client publish");
                Ok(EventOutcome::Applied)
            }
            GenericClientEvent::Timeout { opcode } => {
                if !self.is_provisioned() {
                    tracing::debug!(%opcode, "Ignoring timeout while unprovisioned");
                    return Ok(EventOutcome::Ignored);
                }
                match self.publisher.on_timeout(opcode) {
                    RetryDecision::ResendNow => self.publish(true),
                    RetryDecision::ResendAfter(delay) => {
                        self.notifications.publish(NodeNotification::RetryScheduled {
                            attempt: self.publisher.attempts(),
                            delay,
                        });
                        Ok(EventOutcome::RetryScheduled(delay))
                    }
                    RetryDecision::Exhausted { attempts } => {
                        self.notifications
                            .publish(NodeNotification::RetryExhausted { attempts });
                        Ok(EventOutcome::Applied)
                    }
                    RetryDecision::Ignored => Ok(EventOutcome::Ignored),
                }
            }
            GenericClientEvent::GetState { opcode, .. }
            | GenericClientEvent::SetState { opcode, .. } => {
                tracing::debug!(%opcode, "Ignoring status for other opcode");
                Ok(EventOutcome::Ignored)
            }
        }
    }

    fn publish(&mut self, resend: bool) -> Result<EventOutcome> {
        let provisioned = self.is_provisioned();
        let before = self.publisher.session();
        let result = if resend {
            self.publisher
                .resend(&mut self.transport, &mut self.store, provisioned)
        } else {
            self.publisher
                .request_toggle(&mut self.transport, &mut self.store, provisioned)
        };
        if self.publisher.session() != before {
            self.session_advanced = true;
        }

        let report = match result {
            Ok(report) => report,
            Err(error) => {
                self.notifications.publish(NodeNotification::PublishFailed {
                    error: error.clone(),
                });
                return Err(error.into());
            }
        };

        self.notifications.publish(NodeNotification::Published {
            transaction_id: report.transaction_id,
            on_off: report.on_off,
            resend: report.resend,
        });
        if let Some(err) = report.persist_error {
            self.notifications.publish(NodeNotification::PersistFailed {
                record: self.publisher.session(),
                reason: err.to_string(),
            });
            return Err(err.into());
        }

        Ok(EventOutcome::Published {
            transaction_id: report.transaction_id,
            on_off: report.on_off,
            resend: report.resend,
        })
    }

    /// Loads the session from storage, falling back to the defaults.
    fn restore_session(&mut self) {
        let (record, from_storage) = match self.store.restore() {
            Ok(Some(record)) => {
                tracing::info!(
                    tid = record.transaction_id,
                    on_off = record.on_off,
                    "Restored session"
                );
                self.restored = true;
                (record, true)
            }
            Ok(None) => {
                tracing::info!("No stored session, starting from defaults");
                self.restored = true;
                (SessionRecord::default(), false)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to restore session, using defaults");
                (SessionRecord::default(), false)
            }
        };

        self.publisher.prime(record);
        self.notifications.publish(NodeNotification::SessionRestored {
            record,
            from_storage,
        });
    }
}

impl<T, S> Node<T, S> {
    /// Node configuration.
    #[must_use]
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Device identity.
    #[must_use]
    pub fn identity(&self) -> DeviceIdentity {
        self.identity
    }

    /// Composition registered with the stack.
    #[must_use]
    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    /// Current provisioning state.
    #[must_use]
    pub fn state(&self) -> &ProvisioningState {
        self.provisioning.state()
    }

    /// Returns `true` once the node is a network member.
    #[must_use]
    pub fn is_provisioned(&self) -> bool {
        self.provisioning.is_provisioned()
    }

    /// Current session.
    #[must_use]
    pub fn session(&self) -> SessionRecord {
        self.publisher.session()
    }

    /// Returns `true` once the session was read from storage without error.
    #[must_use]
    pub fn is_restored(&self) -> bool {
        self.restored
    }

    /// Configuration applied by the remote configurator so far.
    #[must_use]
    pub fn configuration(&self) -> &ConfigurationSnapshot {
        self.configuration.snapshot()
    }

    /// Notification bus.
    #[must_use]
    pub fn notifications(&self) -> &NotificationBus {
        &self.notifications
    }

    /// Subscribes to notifications.
    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<NodeNotification> {
        self.notifications.subscribe()
    }

    /// The transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The session store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }
}

fn stack_failure(stage: &'static str, code: i32, context: &str) -> Error {
    Error::Initialization {
        stage,
        source: TransportError::Stack {
            code,
            context: context.to_owned(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use crate::configuration::ConfigurationEvent;
    use crate::provisioning::ProvisionInfo;
    use crate::store::{DoubleBufferStore, MemoryMedium, Slot};
    use crate::transport::LoopbackTransport;
    use crate::types::{Address, Bearer, BearerSet, IvIndex, NetKeyIndex, Opcode, UnicastAddress};

    type TestNode = Node<LoopbackTransport, DoubleBufferStore<MemoryMedium>>;

    fn info() -> ProvisionInfo {
        ProvisionInfo {
            net_index: NetKeyIndex::new(0).unwrap(),
            address: UnicastAddress::new(0x0005).unwrap(),
            flags: 0,
            iv_index: IvIndex(0),
        }
    }

    fn group() -> Address {
        Address::from_raw(0xC000)
    }

    fn start(config: NodeConfig, medium: &MemoryMedium) -> (TestNode, LoopbackTransport) {
        let transport = LoopbackTransport::new();
        let node = Node::start(
            config,
            DeviceIdentity::from_mac([1, 2, 3, 4, 5, 6]),
            transport.clone(),
            DoubleBufferStore::new(medium.clone()),
        )
        .unwrap();
        (node, transport)
    }

    fn provision(node: &mut TestNode, transport: &LoopbackTransport) {
        node.handle(ProvisioningEvent::RegistrationComplete { result: 0 }.into())
            .unwrap();
        node.handle(ProvisioningEvent::LinkOpened(Bearer::Advertising).into())
            .unwrap();
        node.handle(ProvisioningEvent::Complete(info()).into())
            .unwrap();
        let client = node
            .composition()
            .handle(ModelId::GENERIC_ONOFF_CLIENT)
            .unwrap();
        transport.set_publication(client, group());
    }

    fn subscription_added() -> NodeEvent {
        ConfigurationEvent::ModelSubscriptionAdded {
            element: UnicastAddress::new(0x0005).unwrap(),
            address: group(),
            model: ModelId::GENERIC_ONOFF_CLIENT,
        }
        .into()
    }

    fn timeout() -> NodeEvent {
        GenericClientEvent::Timeout {
            opcode: Opcode::GENERIC_ONOFF_SET,
        }
        .into()
    }

    fn seeded_medium(record: SessionRecord) -> MemoryMedium {
        let medium = MemoryMedium::new();
        DoubleBufferStore::new(medium.clone())
            .store(record)
            .unwrap();
        medium
    }

    #[test]
    fn start_registers_identity_and_composition() {
        let (node, transport) = start(NodeConfig::default(), &MemoryMedium::new());

        assert_eq!(transport.identity(), Some(node.identity()));
        assert_eq!(transport.composition().as_ref(), Some(node.composition()));
        assert_eq!(node.state(), &ProvisioningState::Unregistered);
        assert!(node.is_restored());
        assert_eq!(node.session(), SessionRecord::default());
    }

    #[test]
    fn start_restores_session() {
        let medium = seeded_medium(SessionRecord::new(5, true));
        let (node, _) = start(NodeConfig::default(), &medium);
        assert_eq!(node.session(), SessionRecord::new(5, true));
    }

    #[test]
    fn registration_enables_provisioning_and_name() {
        let config = NodeConfig::default()
            .with_bearers(BearerSet::only(Bearer::ProxyGatt))
            .with_device_name("hall switch");
        let (mut node, transport) = start(config, &MemoryMedium::new());

        node.handle(ProvisioningEvent::RegistrationComplete { result: 0 }.into())
            .unwrap();

        assert_eq!(
            transport.provisioning_bearers(),
            Some(BearerSet::only(Bearer::ProxyGatt))
        );
        assert_eq!(transport.unprovisioned_name().as_deref(), Some("hall switch"));
    }

    #[test]
    fn initialize_failure_is_fatal() {
        let transport = LoopbackTransport::new();
        transport.fail_initialize(TransportError::Stack {
            code: -5,
            context: "register".into(),
        });

        let err = Node::start(
            NodeConfig::default(),
            DeviceIdentity::random(),
            transport,
            DoubleBufferStore::new(MemoryMedium::new()),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Initialization {
                stage: "initialize",
                ..
            }
        ));
    }

    #[test]
    fn failed_registration_is_fatal() {
        let (mut node, _) = start(NodeConfig::default(), &MemoryMedium::new());
        let err = node
            .handle(ProvisioningEvent::RegistrationComplete { result: -3 }.into())
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Initialization {
                stage: "registration",
                source: TransportError::Stack { code: -3, .. },
            }
        ));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = Node::start(
            NodeConfig::default().with_event_capacity(0),
            DeviceIdentity::random(),
            LoopbackTransport::new(),
            DoubleBufferStore::new(MemoryMedium::new()),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn subscription_triggers_publish() {
        let medium = seeded_medium(SessionRecord::new(5, true));
        let (mut node, transport) = start(NodeConfig::default(), &medium);
        provision(&mut node, &transport);

        let outcome = node.handle(subscription_added()).unwrap();

        assert_eq!(
            outcome,
            EventOutcome::Published {
                transaction_id: 6,
                on_off: true,
                resend: false
            }
        );
        assert_eq!(transport.sent()[0].payload, vec![0x06, 0x01]);
        assert_eq!(
            DoubleBufferStore::new(medium).restore().unwrap(),
            Some(SessionRecord::new(6, false))
        );
        assert_eq!(
            node.configuration().subscriptions(ModelId::GENERIC_ONOFF_CLIENT),
            vec![group()]
        );
    }

    #[test]
    fn trigger_before_provisioning_is_rejected() {
        let medium = MemoryMedium::new();
        let (mut node, transport) = start(NodeConfig::default(), &medium);
        let mut rx = node.subscribe();

        let err = node.handle(NodeEvent::Trigger).unwrap_err();

        assert!(matches!(
            err,
            Error::Transport(TransportError::NotProvisioned)
        ));
        assert!(transport.sent().is_empty());
        assert_eq!(medium.write_count(), 0);
        assert_eq!(
            rx.try_recv().unwrap(),
            NodeNotification::PublishFailed {
                error: TransportError::NotProvisioned
            }
        );
    }

    #[test]
    fn timeout_resends_immediately_by_default() {
        let medium = seeded_medium(SessionRecord::new(9, false));
        let (mut node, transport) = start(NodeConfig::default(), &medium);
        provision(&mut node, &transport);
        node.handle(NodeEvent::Trigger).unwrap();
        transport.take_sent();

        let outcome = node.handle(timeout()).unwrap();

        assert_eq!(
            outcome,
            EventOutcome::Published {
                transaction_id: 11,
                on_off: true,
                resend: true
            }
        );
        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].payload[0], 11);
    }

    #[test]
    fn timeout_with_backoff_waits_for_retry_due() {
        let config = NodeConfig::default().with_retry(
            RetryPolicy::new().with_initial_delay(Duration::from_millis(250)),
        );
        let (mut node, transport) = start(config, &MemoryMedium::new());
        provision(&mut node, &transport);

        assert_eq!(
            node.handle(timeout()).unwrap(),
            EventOutcome::RetryScheduled(Duration::from_millis(250))
        );
        assert!(transport.sent().is_empty());

        assert!(matches!(
            node.handle(NodeEvent::RetryDue).unwrap(),
            EventOutcome::Published { resend: true, .. }
        ));
        assert_eq!(node.handle(NodeEvent::RetryDue).unwrap(), EventOutcome::Ignored);
    }

    #[test]
    fn timeout_while_unprovisioned_is_ignored() {
        let (mut node, transport) = start(NodeConfig::default(), &MemoryMedium::new());
        assert_eq!(node.handle(timeout()).unwrap(), EventOutcome::Ignored);
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn exhausted_retries_are_reported() {
        let config =
            NodeConfig::default().with_retry(RetryPolicy::new().with_max_retries(1));
        let (mut node, transport) = start(config, &MemoryMedium::new());
        provision(&mut node, &transport);
        let mut rx = node.subscribe();

        node.handle(timeout()).unwrap();
        assert_eq!(node.handle(timeout()).unwrap(), EventOutcome::Applied);

        let notifications: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert!(notifications.contains(&NodeNotification::RetryExhausted { attempts: 1 }));
    }

    #[test]
    fn retry_cap_holds_under_repeated_timeouts() {
        let config =
            NodeConfig::default().with_retry(RetryPolicy::new().with_max_retries(1));
        let (mut node, transport) = start(config, &MemoryMedium::new());
        provision(&mut node, &transport);
        node.handle(NodeEvent::Trigger).unwrap();

        let outcomes: Vec<_> = (0..6).map(|_| node.handle(timeout()).unwrap()).collect();

        assert!(matches!(
            outcomes[0],
            EventOutcome::Published { transaction_id: 2, resend: true, .. }
        ));
        assert!(outcomes[1..].iter().all(|o| *o == EventOutcome::Applied));
        assert_eq!(transport.sent().len(), 2);
    }

    #[test]
    fn overlapping_delayed_timeouts_each_resend() {
        let config = NodeConfig::default().with_retry(
            RetryPolicy::new().with_initial_delay(Duration::from_millis(100)),
        );
        let (mut node, transport) = start(config, &MemoryMedium::new());
        provision(&mut node, &transport);
        node.handle(NodeEvent::Trigger).unwrap();

        for _ in 0..2 {
            assert_eq!(
                node.handle(timeout()).unwrap(),
                EventOutcome::RetryScheduled(Duration::from_millis(100))
            );
        }

        for tid in [2, 3] {
            assert!(matches!(
                node.handle(NodeEvent::RetryDue).unwrap(),
                EventOutcome::Published { transaction_id, resend: true, .. } if transaction_id == tid
            ));
        }
        assert_eq!(node.handle(NodeEvent::RetryDue).unwrap(), EventOutcome::Ignored);
        assert_eq!(transport.sent().len(), 3);
    }

    #[test]
    fn persist_failure_is_surfaced_without_rollback() {
        let medium = MemoryMedium::new();
        let (mut node, transport) = start(NodeConfig::default(), &medium);
        provision(&mut node, &transport);
        medium.set_fail_writes(true);
        let mut rx = node.subscribe();

        let err = node.handle(NodeEvent::Trigger).unwrap_err();

        assert!(matches!(err, Error::Storage(_)));
        assert_eq!(transport.sent().len(), 1);
        assert_eq!(node.session(), SessionRecord::new(1, true));
        assert!(rx.try_recv().unwrap().is_publish());
        assert!(matches!(
            rx.try_recv().unwrap(),
            NodeNotification::PersistFailed { record, .. } if record == SessionRecord::new(1, true)
        ));
    }

    #[test]
    fn boot_restore_failure_retried_on_provisioning() {
        let medium = seeded_medium(SessionRecord::new(20, true));
        medium.set_fail_reads(true);
        let (mut node, transport) = start(NodeConfig::default(), &medium);

        assert!(!node.is_restored());
        assert_eq!(node.session(), SessionRecord::default());

        medium.set_fail_reads(false);
        provision(&mut node, &transport);

        assert!(node.is_restored());
        assert_eq!(node.session(), SessionRecord::new(20, true));
    }

    #[test]
    fn reprovisioning_does_not_rewind_unsaved_session() {
        let medium = seeded_medium(SessionRecord::new(1, true));
        medium.set_fail_reads(true);
        medium.set_fail_writes(true);
        let (mut node, transport) = start(NodeConfig::default(), &medium);
        provision(&mut node, &transport);

        for _ in 0..3 {
            assert!(matches!(
                node.handle(NodeEvent::Trigger),
                Err(Error::Storage(_))
            ));
        }
        assert_eq!(node.session(), SessionRecord::new(3, true));

        node.handle(ProvisioningEvent::NodeReset.into()).unwrap();
        medium.set_fail_reads(false);
        medium.set_fail_writes(false);
        provision(&mut node, &transport);

        assert_eq!(node.session(), SessionRecord::new(3, true));
        node.handle(NodeEvent::Trigger).unwrap();
        assert_eq!(transport.sent().last().unwrap().payload, vec![4, 1]);
    }

    #[test]
    fn corrupt_storage_falls_back_to_defaults() {
        let medium = seeded_medium(SessionRecord::new(20, true));
        medium.corrupt(Slot::A);
        let (node, _) = start(NodeConfig::default(), &medium);

        assert_eq!(node.session(), SessionRecord::default());
    }

    #[test]
    fn node_reset_keeps_session() {
        let (mut node, transport) = start(NodeConfig::default(), &MemoryMedium::new());
        provision(&mut node, &transport);
        node.handle(NodeEvent::Trigger).unwrap();
        node.handle(subscription_added()).unwrap();

        node.handle(ProvisioningEvent::NodeReset.into()).unwrap();

        assert_eq!(node.state(), &ProvisioningState::Unregistered);
        assert_eq!(node.session(), SessionRecord::new(2, false));
        assert!(
            node.configuration()
                .subscriptions(ModelId::GENERIC_ONOFF_CLIENT)
                .is_empty()
        );
    }

    #[test]
    fn set_state_acknowledges() {
        let config = NodeConfig::default().with_retry(RetryPolicy::new().with_max_retries(1));
        let (mut node, transport) = start(config, &MemoryMedium::new());
        provision(&mut node, &transport);

        node.handle(timeout()).unwrap();
        node.handle(
            GenericClientEvent::SetState {
                opcode: Opcode::GENERIC_ONOFF_SET,
                present: true,
            }
            .into(),
        )
        .unwrap();

        // The counter was reset, so another resend is allowed
        assert!(matches!(
            node.handle(timeout()).unwrap(),
            EventOutcome::Published { resend: true, .. }
        ));
    }

    #[test]
    fn unrelated_events_are_ignored() {
        let (mut node, _) = start(NodeConfig::default(), &MemoryMedium::new());

        assert_eq!(
            node.handle(ProvisioningEvent::LinkClosed(Bearer::Advertising).into())
                .unwrap(),
            EventOutcome::Ignored
        );
        assert_eq!(
            node.handle(ConfigurationEvent::Unrecognized { opcode: 0x8003 }.into())
                .unwrap(),
            EventOutcome::Ignored
        );
        assert_eq!(
            node.handle(
                GenericClientEvent::GetState {
                    opcode: Opcode(0x8205),
                    present: false
                }
                .into()
            )
            .unwrap(),
            EventOutcome::Ignored
        );
        assert_eq!(node.handle(NodeEvent::RetryDue).unwrap(), EventOutcome::Ignored);
    }

    #[test]
    fn provisioning_changes_are_broadcast() {
        let (mut node, _) = start(NodeConfig::default(), &MemoryMedium::new());
        let mut rx = node.subscribe();

        node.handle(ProvisioningEvent::RegistrationComplete { result: 0 }.into())
            .unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            NodeNotification::ProvisioningChanged {
                from: ProvisioningState::Unregistered,
                to: ProvisioningState::Registered,
            }
        );
    }
}
