// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Provisioning bearers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Channel a provisioning link runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bearer {
    /// PB-ADV: provisioning over advertising packets.
    Advertising,
    /// PB-GATT: provisioning over a GATT proxy connection.
    ProxyGatt,
}

impl Bearer {
    /// Returns the short name used in the mesh profile.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Advertising => "PB-ADV",
            Self::ProxyGatt => "PB-GATT",
        }
    }
}

impl fmt::Display for Bearer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of bearers to enable for unprovisioned-device advertising.
///
/// # Examples
///
/// ```
/// use mesh_switch::types::{Bearer, BearerSet};
///
/// let bearers = BearerSet::all();
/// assert!(bearers.contains(Bearer::Advertising));
/// assert!(bearers.contains(Bearer::ProxyGatt));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BearerSet {
    /// Enable PB-ADV.
    pub advertising: bool,
    /// Enable PB-GATT.
    pub gatt: bool,
}

impl BearerSet {
    /// Both bearers.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            advertising: true,
            gatt: true,
        }
    }

    /// A single bearer.
    #[must_use]
    pub const fn only(bearer: Bearer) -> Self {
        match bearer {
            Bearer::Advertising => Self {
                advertising: true,
                gatt: false,
            },
            Bearer::ProxyGatt => Self {
                advertising: false,
                gatt: true,
            },
        }
    }

    /// Returns `true` if the bearer is enabled.
    #[must_use]
    pub const fn contains(&self, bearer: Bearer) -> bool {
        match bearer {
            Bearer::Advertising => self.advertising,
            Bearer::ProxyGatt => self.gatt,
        }
    }

    /// Returns `true` if no bearer is enabled.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !self.advertising && !self.gatt
    }
}

impl Default for BearerSet {
    fn default() -> Self {
        Self::all()
    }
}
