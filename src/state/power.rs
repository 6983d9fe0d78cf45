// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Translation between power requests and device parameters.
//!
//! These functions are pure. They read a [`DeviceParams`] snapshot and either
//! report its power state or compute the `params` an update command must
//! carry to reach a requested state.
//!
//! Multi-channel updates always carry the complete `switches` list: the
//! service replaces the list wholesale, so every channel other than the
//! target keeps its current state.

use serde_json::{Value, json};

use crate::error::{DeviceError, Error, ValueError};
use crate::response::{ChannelState, PowerStateReport};
use crate::state::{ChannelSwitch, DeviceParams};
use crate::types::{Channel, PowerState};

/// A requested power change, relative to the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerTransition {
    /// State before the change, if known.
    pub from: Option<PowerState>,
    /// Requested state.
    pub to: PowerState,
}

impl PowerTransition {
    /// Returns true if applying the transition changes the state.
    #[must_use]
    pub fn is_change(&self) -> bool {
        self.from != Some(self.to)
    }
}

/// Resolves the target state of a power change.
///
/// The target is always the explicitly requested state.
#[must_use]
pub fn new_power_state(current: Option<PowerState>, requested: PowerState) -> PowerTransition {
    PowerTransition {
        from: current,
        to: requested,
    }
}

/// Returns the state of every channel, ordered by channel number.
///
/// # Errors
///
/// Returns `DeviceError::NotMultiChannel` if the snapshot has no `switches`.
///
/// # Examples
///
/// ```
/// use ewelink_session::state::{ChannelSwitch, DeviceParams, all_channels_state};
/// use ewelink_session::types::PowerState;
///
/// let params = DeviceParams::multi(vec![
///     ChannelSwitch::new(PowerState::On, 0),
///     ChannelSwitch::new(PowerState::Off, 1),
/// ]);
/// let states: Vec<_> = all_channels_state(&params)
///     .unwrap()
///     .into_iter()
///     .map(|c| c.state)
///     .collect();
/// assert_eq!(states, [PowerState::On, PowerState::Off]);
/// ```
pub fn all_channels_state(params: &DeviceParams) -> Result<Vec<ChannelState>, DeviceError> {
    let switches = params
        .switches
        .as_deref()
        .ok_or(DeviceError::NotMultiChannel)?;

    let mut channels: Vec<ChannelState> = switches
        .iter()
        .enumerate()
        .map(|(position, entry)| ChannelState {
            channel: entry.channel(position),
            state: entry.switch,
        })
        .collect();
    channels.sort_by_key(|c| c.channel);
    Ok(channels)
}

/// Returns the state of one channel.
///
/// A single-channel snapshot answers for channel 1 only.
///
/// # Errors
///
/// Returns `ValueError::InvalidChannel` if the device has no such channel.
pub fn specific_channel_state(
    params: &DeviceParams,
    channel: Channel,
) -> Result<PowerState, ValueError> {
    let invalid = || ValueError::InvalidChannel {
        channel: channel.value(),
        available: params.channel_count(),
    };

    match params.switches.as_deref() {
        Some(switches) => channel_position(switches, channel)
            .and_then(|position| switches.get(position))
            .map(|entry| entry.switch)
            .ok_or_else(invalid),
        None => params
            .switch
            .filter(|_| channel == Channel::FIRST)
            .ok_or_else(invalid),
    }
}

/// Computes the `params` of an update that moves `channel` to `requested`.
///
/// Single-channel devices get `{"switch": requested}` and ignore the
/// channel. Multi-channel devices get the full `switches` list with only the
/// target entry changed.
///
/// # Errors
///
/// Returns `ValueError::InvalidChannel` if a multi-channel device has no
/// such channel.
///
/// # Examples
///
/// ```
/// use ewelink_session::state::{ChannelSwitch, DeviceParams, power_state_params};
/// use ewelink_session::types::{Channel, PowerState};
///
/// let params = DeviceParams::multi(vec![
///     ChannelSwitch::new(PowerState::On, 0),
///     ChannelSwitch::new(PowerState::Off, 1),
/// ]);
/// let update = power_state_params(&params, PowerState::On, Channel::new(2).unwrap()).unwrap();
/// assert_eq!(
///     update,
///     serde_json::json!({"switches": [
///         {"switch": "on", "outlet": 0},
///         {"switch": "on", "outlet": 1}
///     ]})
/// );
/// ```
pub fn power_state_params(
    params: &DeviceParams,
    requested: PowerState,
    channel: Channel,
) -> Result<Value, ValueError> {
    let Some(current) = params.switches.as_deref() else {
        return Ok(json!({ "switch": requested }));
    };

    let position = channel_position(current, channel).ok_or(ValueError::InvalidChannel {
        channel: channel.value(),
        available: current.len(),
    })?;

    let mut switches = current.to_vec();
    if let Some(entry) = switches.get_mut(position) {
        entry.switch = requested;
    }
    Ok(json!({ "switches": switches }))
}

/// Builds a normalized report from a snapshot.
///
/// # Errors
///
/// Returns `ValueError::InvalidChannel` for an unknown channel and
/// `DeviceError::MissingPowerState` if the snapshot has no power fields.
pub fn power_state_report(
    params: &DeviceParams,
    channel: Channel,
    all_channels: bool,
) -> Result<PowerStateReport, Error> {
    if params.is_multi_channel() {
        if all_channels {
            return Ok(PowerStateReport::all_channels(all_channels_state(params)?));
        }
        let state = specific_channel_state(params, channel)?;
        return Ok(PowerStateReport::single(state, channel));
    }

    let state = params.switch.ok_or(DeviceError::MissingPowerState)?;
    Ok(PowerStateReport::single(state, channel))
}

/// Finds the list position addressed by `channel`.
fn channel_position(switches: &[ChannelSwitch], channel: Channel) -> Option<usize> {
    switches
        .iter()
        .enumerate()
        .position(|(position, entry)| entry.channel(position) == channel)
}
