// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device parameter snapshots and power-state resolution.

mod params;
mod power;

pub use params::{ChannelSwitch, DeviceParams};
pub use power::{
    PowerTransition, all_channels_state, new_power_state, power_state_params, power_state_report,
    specific_channel_state,
};
