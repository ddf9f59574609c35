// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Configuration-server notifications.
//!
//! After provisioning, a remote configurator adds an application key, binds it
//! to the client models, and sets their publication and subscriptions. The
//! mesh stack applies those changes itself; the node only watches them.
//!
//! One notification has a visible effect: subscribing the on/off client to a
//! group makes the node publish a toggle right away, so whoever is
//! commissioning the switch sees the group react.

use std::collections::HashMap;

use crate::types::{Address, AppKeyIndex, ModelId, NetKeyIndex, UnicastAddress};

/// A configuration change applied by the local configuration server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationEvent {
    /// An application key was added.
    AppKeyAdded {
        /// Network key the application key is bound to.
        net_index: NetKeyIndex,
        /// Index of the new application key.
        app_index: AppKeyIndex,
    },
    /// An application key was bound to a model.
    ModelAppBound {
        /// Element hosting the model.
        element: UnicastAddress,
        /// The bound application key.
        app_index: AppKeyIndex,
        /// The model.
        model: ModelId,
    },
    /// A model was subscribed to an address.
    ModelSubscriptionAdded {
        /// Element hosting the model.
        element: UnicastAddress,
        /// The subscribed address.
        address: Address,
        /// The model.
        model: ModelId,
    },
    /// A model subscription was removed.
    ModelSubscriptionDeleted {
        /// Element hosting the model.
        element: UnicastAddress,
        /// The removed address.
        address: Address,
        /// The model.
        model: ModelId,
    },
    /// A model's publication was set.
    ModelPublicationSet {
        /// Element hosting the model.
        element: UnicastAddress,
        /// The new publish address.
        address: Address,
        /// The model.
        model: ModelId,
    },
    /// A configuration message this node has no use for.
    Unrecognized {
        /// The configuration opcode.
        opcode: u32,
    },
}

/// What the node should do about a configuration event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    /// Publish one toggle command.
    PublishToggle,
    /// Recorded in the snapshot; nothing else to do.
    Recorded,
    /// Not relevant to this node.
    Ignored,
}

/// Configuration applied so far by the remote configurator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigurationSnapshot {
    app_keys: Vec<(NetKeyIndex, AppKeyIndex)>,
    bindings: Vec<(ModelId, AppKeyIndex)>,
    subscriptions: Vec<(ModelId, Address)>,
    publications: HashMap<ModelId, Address>,
}

impl ConfigurationSnapshot {
    /// Application keys added, with their network key.
    #[must_use]
    pub fn app_keys(&self) -> &[(NetKeyIndex, AppKeyIndex)] {
        &self.app_keys
    }

    /// Application keys bound to `model`.
    #[must_use]
    pub fn bindings(&self, model: ModelId) -> Vec<AppKeyIndex> {
        self.bindings
            .iter()
            .filter(|(m, _)| *m == model)
            .map(|(_, app)| *app)
            .collect()
    }

    /// Addresses `model` is subscribed to.
    #[must_use]
    pub fn subscriptions(&self, model: ModelId) -> Vec<Address> {
        self.subscriptions
            .iter()
            .filter(|(m, _)| *m == model)
            .map(|(_, addr)| *addr)
            .collect()
    }

    /// Publish address last set for `model`.
    #[must_use]
    pub fn publication(&self, model: ModelId) -> Option<Address> {
        self.publications.get(&model).copied()
    }
}

/// Filters configuration events and keeps a [`ConfigurationSnapshot`].
///
/// # Examples
///
/// ```
/// use mesh_switch::configuration::{ConfigAction, ConfigurationEvent, ConfigurationFilter};
/// use mesh_switch::types::{Address, ModelId, UnicastAddress};
///
/// let mut filter = ConfigurationFilter::new(ModelId::GENERIC_ONOFF_CLIENT);
///
/// let action = filter.handle(&ConfigurationEvent::ModelSubscriptionAdded {
///     element: UnicastAddress::new(0x0005).unwrap(),
///     address: Address::from_raw(0xC000),
///     model: ModelId::GENERIC_ONOFF_CLIENT,
/// });
/// assert_eq!(action, ConfigAction::PublishToggle);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigurationFilter {
    trigger_model: ModelId,
    snapshot: ConfigurationSnapshot,
}

impl ConfigurationFilter {
    /// Creates a filter that triggers on subscriptions of `trigger_model`.
    #[must_use]
    pub fn new(trigger_model: ModelId) -> Self {
        Self {
            trigger_model,
            snapshot: ConfigurationSnapshot::default(),
        }
    }

    /// Configuration observed so far.
    #[must_use]
    pub fn snapshot(&self) -> &ConfigurationSnapshot {
        &self.snapshot
    }

    /// Forgets everything observed, e.g. after the node left its network.
    pub fn reset(&mut self) {
        self.snapshot = ConfigurationSnapshot::default();
    }

    /// Records an event and decides what the node should do about it.
    pub fn handle(&mut self, event: &ConfigurationEvent) -> ConfigAction {
        let snapshot = &mut self.snapshot;

        match *event {
            ConfigurationEvent::AppKeyAdded {
                net_index,
                app_index,
            } => {
                tracing::info!(%net_index, %app_index, "AppKey added");
                push_unique(&mut snapshot.app_keys, (net_index, app_index));
                ConfigAction::Recorded
            }
            ConfigurationEvent::ModelAppBound {
                element,
                app_index,
                model,
            } => {
                tracing::info!(%element, %app_index, %model, "Model bound to AppKey");
                push_unique(&mut snapshot.bindings, (model, app_index));
                ConfigAction::Recorded
            }
            ConfigurationEvent::ModelSubscriptionAdded {
                element,
                address,
                model,
            } => {
                tracing::info!(%element, %address, %model, "Model subscription added");
                push_unique(&mut snapshot.subscriptions, (model, address));
                if model == self.trigger_model {
                    ConfigAction::PublishToggle
                } else {
                    ConfigAction::Recorded
                }
            }
            ConfigurationEvent::ModelSubscriptionDeleted {
                element,
                address,
                model,
            } => {
                tracing::info!(%element, %address, %model, "Model subscription deleted");
                snapshot
                    .subscriptions
                    .retain(|entry| *entry != (model, address));
                ConfigAction::Recorded
            }
            ConfigurationEvent::ModelPublicationSet {
                element,
                address,
                model,
            } => {
                tracing::info!(%element, %address, %model, "Model publication set");
                snapshot.publications.insert(model, address);
                ConfigAction::Recorded
            }
            ConfigurationEvent::Unrecognized { opcode } => {
                tracing::debug!(opcode = format_args!("{opcode:#06x}"), "Ignoring configuration event");
                ConfigAction::Ignored
            }
        }
    }
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}
