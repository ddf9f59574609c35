// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the switch node.
//!
//! Failures are split by the collaborator that produced them: the durable
//! medium ([`StorageError`]), the mesh stack ([`TransportError`]), value
//! validation ([`ValueError`]) and configuration loading ([`ConfigError`]).
//!
//! Events that are irrelevant in the current state are not errors. Handlers
//! report them as [`EventOutcome::Ignored`](crate::node::EventOutcome::Ignored).

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The durable medium failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The mesh transport rejected or could not attempt an operation.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A mesh value was outside its allowed range.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// The node configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Node startup failed; the node cannot operate.
    #[error("initialization failed during {stage}: {source}")]
    Initialization {
        /// The startup step that failed.
        stage: &'static str,
        /// The underlying transport failure.
        #[source]
        source: TransportError,
    },

    /// The node's event loop is no longer running.
    #[error("node event loop has stopped")]
    NodeStopped,
}

/// Errors reported by the persistent state store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the medium failed at the I/O level.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored record failed validation.
    #[error("corrupt record in slot {slot}: {reason}")]
    Corrupt {
        /// The slot holding the corrupt record.
        slot: u8,
        /// Why the record was rejected.
        reason: String,
    },

    /// The medium could not be opened.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The medium refused a write.
    #[error("write failed: {0}")]
    WriteFailed(String),
}

/// Errors reported by, or about, the mesh transport.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The mesh stack has not been initialized.
    #[error("mesh stack is not initialized")]
    NotInitialized,

    /// The node has not been provisioned into a network.
    #[error("node is not provisioned")]
    NotProvisioned,

    /// The client model has no publish destination configured.
    #[error("no publish destination configured")]
    NoDestination,

    /// The stack refused to send the message.
    #[error("send rejected: {0}")]
    SendRejected(String),

    /// The stack returned an error code.
    #[error("{context} failed with code {code}")]
    Stack {
        /// The raw stack error code.
        code: i32,
        /// The operation that failed.
        context: String,
    },
}

/// Errors related to mesh value validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual:#06x} is out of range [{min:#06x}, {max:#06x}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: u16,
        /// Maximum allowed value.
        max: u16,
        /// The actual value that was provided.
        actual: u16,
    },

    /// A device name is longer than the stack accepts.
    #[error("device name is {0} bytes, at most 20 are allowed")]
    NameTooLong(usize),
}

/// Errors related to loading node configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A configuration value is not acceptable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
