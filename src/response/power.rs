// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Normalized power-state reports.

use serde::{Deserialize, Serialize};

use crate::response::CommandStatus;
use crate::types::{Channel, PowerState};

/// State of one channel of a multi-channel device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelState {
    /// 1-based channel number.
    pub channel: Channel,
    /// Current state of the channel.
    pub state: PowerState,
}

/// The `state` part of a report: one state, or one per channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportedState {
    /// A single device or a single requested channel.
    Single(PowerState),
    /// Every channel, ordered by channel number.
    AllChannels(Vec<ChannelState>),
}

/// Power state of a device, normalized across single- and multi-channel
/// devices.
///
/// # Examples
///
/// ```
/// use ewelink_session::response::{PowerStateReport, ReportedState};
/// use ewelink_session::types::{Channel, PowerState};
///
/// let report = PowerStateReport::single(PowerState::On, Channel::FIRST);
/// assert_eq!(report.state, ReportedState::Single(PowerState::On));
/// assert_eq!(
///     serde_json::to_string(&report).unwrap(),
///     r#"{"status":"ok","state":"on","channel":1}"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerStateReport {
    /// Always `ok` for a successfully built report.
    pub status: CommandStatus,
    /// The reported state.
    pub state: ReportedState,
    /// The channel the state belongs to; absent for all-channel reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<Channel>,
}

impl PowerStateReport {
    /// Creates a report for one channel (or a single-channel device).
    #[must_use]
    pub fn single(state: PowerState, channel: Channel) -> Self {
        Self {
            status: CommandStatus::Ok,
            state: ReportedState::Single(state),
            channel: Some(channel),
        }
    }

    /// Creates a report listing every channel.
    #[must_use]
    pub fn all_channels(channels: Vec<ChannelState>) -> Self {
        Self {
            status: CommandStatus::Ok,
            state: ReportedState::AllChannels(channels),
            channel: None,
        }
    }

    /// Returns the single reported state, if this is not an all-channel report.
    #[must_use]
    pub fn single_state(&self) -> Option<PowerState> {
        match self.state {
            ReportedState::Single(state) => Some(state),
            ReportedState::AllChannels(_) => None,
        }
    }
}
