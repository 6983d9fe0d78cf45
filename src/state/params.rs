// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device parameter snapshots.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ParseError;
use crate::types::{Channel, PowerState};

/// One entry of a multi-channel device's `switches` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSwitch {
    /// Current state of the outlet.
    pub switch: PowerState,
    /// 0-based outlet number declared by the device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outlet: Option<u8>,
}

impl ChannelSwitch {
    /// Creates an entry for the given outlet.
    #[must_use]
    pub fn new(switch: PowerState, outlet: u8) -> Self {
        Self {
            switch,
            outlet: Some(outlet),
        }
    }

    /// Returns the channel this entry addresses, falling back to its
    /// position in the list when the device declares no outlet.
    #[must_use]
    pub fn channel(&self, position: usize) -> Channel {
        let outlet = self
            .outlet
            .unwrap_or_else(|| u8::try_from(position).unwrap_or(u8::MAX));
        Channel::from_outlet(outlet)
    }
}

/// The `params` object of a device.
///
/// A single-channel device reports `switch`; a multi-channel device reports
/// `switches`. Every other parameter is kept in `extra` untouched.
///
/// # Examples
///
/// ```
/// use ewelink_session::state::DeviceParams;
/// use ewelink_session::types::PowerState;
///
/// let params = DeviceParams::from_value(serde_json::json!({
///     "switch": "on",
///     "fwVersion": "3.5.0"
/// })).unwrap();
///
/// assert!(!params.is_multi_channel());
/// assert_eq!(params.switch, Some(PowerState::On));
/// assert_eq!(params.extra["fwVersion"], "3.5.0");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceParams {
    /// Power state of a single-channel device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub switch: Option<PowerState>,
    /// Per-outlet states of a multi-channel device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub switches: Option<Vec<ChannelSwitch>>,
    /// All other parameters.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DeviceParams {
    /// Creates the parameters of a single-channel device.
    #[must_use]
    pub fn single(state: PowerState) -> Self {
        Self {
            switch: Some(state),
            ..Self::default()
        }
    }

    /// Creates the parameters of a multi-channel device.
    #[must_use]
    pub fn multi(switches: Vec<ChannelSwitch>) -> Self {
        Self {
            switches: Some(switches),
            ..Self::default()
        }
    }

    /// Parses parameters from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Json` if the value is not an object or a power
    /// field holds an unknown state.
    pub fn from_value(value: Value) -> Result<Self, ParseError> {
        serde_json::from_value(value).map_err(ParseError::Json)
    }

    /// Returns true if the device reports a `switches` list.
    #[must_use]
    pub fn is_multi_channel(&self) -> bool {
        self.switches.is_some()
    }

    /// Returns the number of channels the device reports.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        match &self.switches {
            Some(switches) => switches.len(),
            None => usize::from(self.switch.is_some()),
        }
    }
}
