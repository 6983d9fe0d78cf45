// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared across the library.
//!
//! These types validate their contents on construction, so code receiving a
//! [`PowerState`] or [`Channel`] never needs to re-check it.

mod credential;
mod power;
mod sequence;

pub use credential::{AccountCredentials, ApiKey};
pub use power::{Channel, PowerState};
pub use sequence::{SequenceGenerator, SequenceId};

pub(crate) use sequence::unix_timestamp;
