// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for the mesh layer.
//!
//! Each type checks its range at construction time, so values handed to the
//! node by the transport glue are known to be well-formed.
//!
//! # Types
//!
//! - [`UnicastAddress`], [`GroupAddress`], [`Address`] - mesh addresses
//! - [`NetKeyIndex`], [`AppKeyIndex`] - 12-bit key indexes
//! - [`IvIndex`] - network IV index
//! - [`CompanyId`], [`ModelId`] - model identification
//! - [`Opcode`] - access-layer message opcodes
//! - [`Bearer`], [`BearerSet`] - provisioning bearers

mod address;
mod bearer;
mod model;

pub use address::{Address, AppKeyIndex, GroupAddress, IvIndex, NetKeyIndex, UnicastAddress};
pub use bearer::{Bearer, BearerSet};
pub use model::{CompanyId, ModelId, Opcode};
