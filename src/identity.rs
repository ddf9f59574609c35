// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device identity advertised while unprovisioned.

use std::fmt;

use uuid::Uuid;

/// Prefix placed in front of the MAC address by [`DeviceIdentity::from_mac`].
pub const UUID_PREFIX: [u8; 2] = [0xdd, 0xdd];

/// The 128-bit device UUID carried in unprovisioned device beacons.
///
/// An identity is created once per physical unit and never changes for the
/// lifetime of the process.
///
/// # Examples
///
/// ```
/// use mesh_switch::DeviceIdentity;
///
/// let id = DeviceIdentity::from_mac([0x24, 0x0a, 0xc4, 0x01, 0x02, 0x03]);
/// assert_eq!(&id.as_bytes()[..2], &[0xdd, 0xdd]);
/// assert_eq!(&id.as_bytes()[2..8], &[0x24, 0x0a, 0xc4, 0x01, 0x02, 0x03]);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceIdentity(Uuid);

impl DeviceIdentity {
    /// Derives the identity from the Bluetooth MAC address.
    ///
    /// Layout: two prefix bytes, the six MAC bytes, then zeros.
    #[must_use]
    pub fn from_mac(mac: [u8; 6]) -> Self {
        let mut bytes = [0u8; 16];
        bytes[..2].copy_from_slice(&UUID_PREFIX);
        bytes[2..8].copy_from_slice(&mac);
        Self(Uuid::from_bytes(bytes))
    }

    /// Creates a random identity.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an identity from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Returns the raw bytes, in advertising order.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Debug for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceIdentity({})", self.0)
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for DeviceIdentity {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}
