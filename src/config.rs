// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Node configuration.
//!
//! Everything has a default matching the reference switch firmware, so
//! `NodeConfig::default()` is a working configuration. Settings can also be
//! loaded from JSON:
//!
//! ```
//! use mesh_switch::NodeConfig;
//!
//! let config = NodeConfig::from_json_str(r#"{
//!     "storage": { "namespace": "switch", "key": "session" },
//!     "retry": { "max_retries": 5, "initial_delay_ms": 200 },
//!     "device_name": "hall-switch"
//! }"#).unwrap();
//!
//! assert_eq!(config.storage.namespace, "switch");
//! assert_eq!(config.retry.max_retries, Some(5));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ValueError};
use crate::types::BearerSet;

/// Longest unprovisioned device name the stack accepts.
pub const MAX_DEVICE_NAME_LEN: usize = 20;

/// Where the session record lives on the durable medium.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Namespace (directory or NVS partition namespace).
    pub namespace: String,
    /// Key of the record within the namespace.
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            namespace: "mesh_example".to_string(),
            key: "onoff_client".to_string(),
        }
    }
}

/// What to do when an on/off set times out without acknowledgment.
///
/// The default resends immediately on every timeout with no limit. A cap and
/// exponential backoff can be configured instead.
///
/// Every timeout accepted by the policy counts against `max_retries`. With a
/// delay, a timeout that arrives while an earlier resend is still waiting
/// schedules its own resend, so each counted attempt is sent. Once the limit
/// is reached, timeouts are refused until the next fresh publish or
/// acknowledgment.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use mesh_switch::config::RetryPolicy;
///
/// // Default: resend on every timeout, forever
/// let policy = RetryPolicy::default();
/// assert!(policy.should_retry(10_000));
/// assert_eq!(policy.delay_for_attempt(3), Duration::ZERO);
///
/// // At most 3 resends, backing off from 500 ms
/// let policy = RetryPolicy::new()
///     .with_max_retries(3)
///     .with_initial_delay(Duration::from_millis(500))
///     .with_backoff_multiplier(2.0)
///     .with_max_delay(Duration::from_secs(5));
/// assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Whether timeouts trigger a resend at all.
    pub enabled: bool,
    /// Maximum consecutive resends (None = infinite).
    pub max_retries: Option<u32>,
    /// Delay before the first resend.
    #[serde(rename = "initial_delay_ms", with = "duration_ms")]
    pub initial_delay: Duration,
    /// Upper bound for the backoff delay.
    #[serde(rename = "max_delay_ms", with = "duration_ms")]
    pub max_delay: Duration,
    /// Multiplier applied per attempt.
    pub backoff_multiplier: f32,
}

impl RetryPolicy {
    /// Creates the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a policy that never resends.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Sets the maximum number of consecutive resends.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Removes the resend limit.
    #[must_use]
    pub fn with_infinite_retries(mut self) -> Self {
        self.max_retries = None;
        self
    }

    /// Sets the delay before the first resend.
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the upper bound for the backoff delay.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: f32) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Delay before resend number `attempt` (0-based).
    ///
    /// A `max_delay` below `initial_delay` is treated as `initial_delay`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 || self.initial_delay.is_zero() {
            return self.initial_delay;
        }

        let multiplier = self
            .backoff_multiplier
            .powi(i32::try_from(attempt).unwrap_or(i32::MAX));

        #[allow(clippy::cast_precision_loss)]
        let delay_ms = self.initial_delay.as_millis() as f32 * multiplier;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let delay = Duration::from_millis(delay_ms as u64);

        delay.min(self.max_delay.max(self.initial_delay))
    }

    /// Returns `true` if resend number `attempt` (0-based) is allowed.
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        self.enabled && self.max_retries.is_none_or(|max| attempt < max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: None,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }
}

/// Complete node configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Session record location.
    pub storage: StorageConfig,
    /// Bearers enabled for provisioning.
    pub bearers: BearerSet,
    /// Resend behaviour on acknowledgment timeout.
    pub retry: RetryPolicy,
    /// Capacity of the inbound event channel.
    pub event_capacity: usize,
    /// Capacity of the notification broadcast channel.
    pub notification_capacity: usize,
    /// Name advertised while unprovisioned.
    pub device_name: Option<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            bearers: BearerSet::all(),
            retry: RetryPolicy::default(),
            event_capacity: 32,
            notification_capacity: 64,
            device_name: None,
        }
    }
}

impl NodeConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a JSON configuration.
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the JSON is malformed or a value is invalid.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the storage location.
    #[must_use]
    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    /// Sets the provisioning bearers.
    #[must_use]
    pub fn with_bearers(mut self, bearers: BearerSet) -> Self {
        self.bearers = bearers;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the inbound event channel capacity.
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Sets the unprovisioned device name.
    #[must_use]
    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = Some(name.into());
        self
    }

    /// Checks value constraints.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_capacity == 0 {
            return Err(ConfigError::Invalid("event_capacity must be non-zero".into()));
        }
        if self.notification_capacity == 0 {
            return Err(ConfigError::Invalid(
                "notification_capacity must be non-zero".into(),
            ));
        }
        if self.bearers.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one provisioning bearer must be enabled".into(),
            ));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "backoff_multiplier {} is below 1.0",
                self.retry.backoff_multiplier
            )));
        }
        if self.storage.namespace.is_empty() || self.storage.key.is_empty() {
            return Err(ConfigError::Invalid(
                "storage namespace and key must be non-empty".into(),
            ));
        }
        if let Some(name) = &self.device_name
            && name.len() > MAX_DEVICE_NAME_LEN
        {
            return Err(ConfigError::Invalid(
                ValueError::NameTooLong(name.len()).to_string(),
            ));
        }
        Ok(())
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = NodeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage.namespace, "mesh_example");
        assert_eq!(config.storage.key, "onoff_client");
        assert_eq!(config.bearers, BearerSet::all());
    }

    #[test]
    fn default_retry_is_unbounded_and_immediate() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(u32::MAX));
        assert_eq!(policy.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(policy.delay_for_attempt(50), Duration::ZERO);
    }

    #[test]
    fn retry_disabled() {
        let policy = RetryPolicy::disabled();
        assert!(!policy.should_retry(0));
    }

    #[test]
    fn retry_cap() {
        let policy = RetryPolicy::new().with_max_retries(2);
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(1));
        assert!(!policy.should_retry(2));
    }

    #[test]
    fn backoff_delay_calculation() {
        let policy = RetryPolicy::new()
            .with_initial_delay(Duration::from_millis(100))
            .with_backoff_multiplier(2.0)
            .with_max_delay(Duration::from_millis(500));

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(500));
    }

    #[test]
    fn json_fills_defaults() {
        let config = NodeConfig::from_json_str("{}").unwrap();
        assert_eq!(config, NodeConfig::default());
    }

    #[test]
    fn json_retry_millis() {
        let config = NodeConfig::from_json_str(
            r#"{"retry": {"initial_delay_ms": 250, "max_delay_ms": 1000, "backoff_multiplier": 2.0}}"#,
        )
        .unwrap();
        assert_eq!(config.retry.initial_delay, Duration::from_millis(250));
        assert_eq!(config.retry.max_delay, Duration::from_secs(1));
    }

    #[test]
    fn rejects_zero_capacity() {
        let err = NodeConfig::from_json_str(r#"{"event_capacity": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_no_bearers() {
        let config =
            NodeConfig::new().with_bearers(BearerSet { advertising: false, gatt: false });
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_long_name() {
        let config = NodeConfig::new().with_device_name("a-very-long-switch-name-indeed");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("at most 20"));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = NodeConfig::from_json_str("{").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }
}
