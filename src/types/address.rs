// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh addresses and key indexes.
//!
//! The 16-bit mesh address space is partitioned by its top bits:
//!
//! | Range | Kind |
//! |-------|------|
//! | `0x0000` | unassigned |
//! | `0x0001..=0x7FFF` | unicast (one element) |
//! | `0x8000..=0xBFFF` | virtual (label UUID hash) |
//! | `0xC000..=0xFFFF` | group |

use std::fmt;

use crate::error::ValueError;

/// Address of a single element inside the mesh.
///
/// # Examples
///
/// ```
/// use mesh_switch::types::UnicastAddress;
///
/// let addr = UnicastAddress::new(0x0005).unwrap();
/// assert_eq!(addr.value(), 0x0005);
/// assert!(UnicastAddress::new(0xC000).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnicastAddress(u16);

impl UnicastAddress {
    /// Lowest valid unicast address.
    pub const MIN: u16 = 0x0001;
    /// Highest valid unicast address.
    pub const MAX: u16 = 0x7FFF;

    /// Creates a unicast address.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if the value is not a unicast address.
    pub fn new(value: u16) -> Result<Self, ValueError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ValueError::OutOfRange {
                min: Self::MIN,
                max: Self::MAX,
                actual: value,
            })
        }
    }

    /// Returns the raw address.
    #[must_use]
    pub const fn value(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for UnicastAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Group address a client publishes to or subscribes on.
///
/// # Examples
///
/// ```
/// use mesh_switch::types::GroupAddress;
///
/// let group = GroupAddress::new(0xC001).unwrap();
/// assert_eq!(group.to_string(), "0xc001");
/// assert!(GroupAddress::new(0x0001).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupAddress(u16);

impl GroupAddress {
    /// Lowest valid group address.
    pub const MIN: u16 = 0xC000;
    /// Highest valid group address.
    pub const MAX: u16 = 0xFFFF;
    /// The all-nodes fixed group.
    pub const ALL_NODES: Self = Self(0xFFFF);

    /// Creates a group address.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if the value is not a group address.
    pub fn new(value: u16) -> Result<Self, ValueError> {
        if value >= Self::MIN {
            Ok(Self(value))
        } else {
            Err(ValueError::OutOfRange {
                min: Self::MIN,
                max: Self::MAX,
                actual: value,
            })
        }
    }

    /// Returns the raw address.
    #[must_use]
    pub const fn value(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for GroupAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Any mesh address, classified by range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Address {
    /// `0x0000`; used by the stack to mean "publication disabled".
    Unassigned,
    /// A single element.
    Unicast(UnicastAddress),
    /// A virtual address (hash of a label UUID).
    Virtual(u16),
    /// A group of elements.
    Group(GroupAddress),
}

impl Address {
    /// Classifies a raw 16-bit address.
    #[must_use]
    pub const fn from_raw(value: u16) -> Self {
        match value {
            0x0000 => Self::Unassigned,
            0x0001..=0x7FFF => Self::Unicast(UnicastAddress(value)),
            0x8000..=0xBFFF => Self::Virtual(value),
            _ => Self::Group(GroupAddress(value)),
        }
    }

    /// Returns the raw address.
    #[must_use]
    pub const fn value(&self) -> u16 {
        match self {
            Self::Unassigned => 0,
            Self::Unicast(addr) => addr.0,
            Self::Virtual(raw) => *raw,
            Self::Group(addr) => addr.0,
        }
    }

    /// Returns `true` if a message sent here reaches some element.
    #[must_use]
    pub const fn is_assigned(&self) -> bool {
        !matches!(self, Self::Unassigned)
    }
}

impl From<UnicastAddress> for Address {
    fn from(addr: UnicastAddress) -> Self {
        Self::Unicast(addr)
    }
}

impl From<GroupAddress> for Address {
    fn from(addr: GroupAddress) -> Self {
        Self::Group(addr)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.value())
    }
}

macro_rules! key_index {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u16);

        impl $name {
            /// Highest valid key index (12 bits).
            pub const MAX: u16 = 0x0FFF;

            /// Creates a key index.
            ///
            /// # Errors
            ///
            /// Returns `ValueError::OutOfRange` if the value needs more than 12 bits.
            pub fn new(value: u16) -> Result<Self, ValueError> {
                if value <= Self::MAX {
                    Ok(Self(value))
                } else {
                    Err(ValueError::OutOfRange {
                        min: 0,
                        max: Self::MAX,
                        actual: value,
                    })
                }
            }

            /// Returns the raw index.
            #[must_use]
            pub const fn value(&self) -> u16 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:#06x}", self.0)
            }
        }
    };
}

key_index!(
    /// Global index of a network key.
    NetKeyIndex
);

key_index!(
    /// Global index of an application key.
    AppKeyIndex
);

/// Network IV index, carried in the provisioning data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IvIndex(pub u32);

impl fmt::Display for IvIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}
