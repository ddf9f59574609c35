// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Model identifiers and access-layer opcodes.

use std::fmt;

/// Bluetooth SIG assigned company identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompanyId(pub u16);

impl CompanyId {
    /// Marker used by configuration messages for SIG-defined models.
    pub const SIG: Self = Self(0xFFFF);
    /// Espressif Systems.
    pub const ESPRESSIF: Self = Self(0x02E5);
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Identifies a model, either SIG-defined or vendor-specific.
///
/// # Examples
///
/// ```
/// use mesh_switch::types::{CompanyId, ModelId};
///
/// let model = ModelId::from_config(CompanyId::SIG, 0x1001);
/// assert_eq!(model, ModelId::GENERIC_ONOFF_CLIENT);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelId {
    /// A model defined by the Bluetooth SIG.
    Sig(u16),
    /// A model defined by a vendor.
    Vendor {
        /// The vendor's company identifier.
        company: CompanyId,
        /// The vendor-assigned model number.
        model: u16,
    },
}

impl ModelId {
    /// Configuration Server.
    pub const CONFIG_SERVER: Self = Self::Sig(0x0000);
    /// Generic OnOff Client.
    pub const GENERIC_ONOFF_CLIENT: Self = Self::Sig(0x1001);
    /// Light Lightness Client.
    pub const LIGHT_LIGHTNESS_CLIENT: Self = Self::Sig(0x1302);

    /// Builds a model id from the (company, model) pair carried in
    /// configuration messages, where company `0xFFFF` means SIG.
    #[must_use]
    pub const fn from_config(company: CompanyId, model: u16) -> Self {
        if company.0 == CompanyId::SIG.0 {
            Self::Sig(model)
        } else {
            Self::Vendor { company, model }
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sig(id) => write!(f, "sig:{id:#06x}"),
            Self::Vendor { company, model } => write!(f, "{company}:{model:#06x}"),
        }
    }
}

/// An access-layer message opcode.
///
/// Only the opcodes this node sends or reacts to have named constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode(pub u32);

impl Opcode {
    /// Generic OnOff Get.
    pub const GENERIC_ONOFF_GET: Self = Self(0x8201);
    /// Generic OnOff Set (acknowledged).
    pub const GENERIC_ONOFF_SET: Self = Self(0x8202);
    /// Generic OnOff Set Unacknowledged.
    pub const GENERIC_ONOFF_SET_UNACK: Self = Self(0x8203);
    /// Generic OnOff Status.
    pub const GENERIC_ONOFF_STATUS: Self = Self(0x8204);

    /// Returns `true` for the generic on/off opcode family.
    #[must_use]
    pub const fn is_generic_onoff(&self) -> bool {
        matches!(self.0, 0x8201..=0x8204)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}
