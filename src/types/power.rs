// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Power-related types.
//!
//! This module provides the power state enumeration accepted by the service
//! and the channel address used on multi-channel devices.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Represents the power state of a device or channel.
///
/// Only explicit states are accepted; there is no toggle.
///
/// # Examples
///
/// ```
/// use ewelink_session::types::PowerState;
///
/// assert_eq!(PowerState::On.as_str(), "on");
/// assert_eq!("off".parse::<PowerState>().unwrap(), PowerState::Off);
/// assert!("toggle".parse::<PowerState>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    /// Power is off.
    Off,
    /// Power is on.
    On,
}

impl PowerState {
    /// Every state the service accepts in an update.
    pub const VALID: [Self; 2] = [Self::On, Self::Off];

    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::On => "on",
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PowerState {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::VALID
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValueError::InvalidPowerState(s.to_string()))
    }
}

/// A 1-based channel on a multi-channel device.
///
/// Single-channel devices ignore the channel entirely.
///
/// # Examples
///
/// ```
/// use ewelink_session::types::Channel;
///
/// let second = Channel::new(2).unwrap();
/// assert_eq!(second.value(), 2);
///
/// assert!(Channel::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Channel(u8);

impl Channel {
    /// The first channel.
    pub const FIRST: Self = Self(1);

    /// Creates a channel from its 1-based number.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidChannel` for channel 0.
    pub fn new(channel: u8) -> Result<Self, ValueError> {
        if channel == 0 {
            return Err(ValueError::InvalidChannel {
                channel,
                available: 0,
            });
        }
        Ok(Self(channel))
    }

    /// Creates a channel from a 0-based outlet number, as reported by devices.
    #[must_use]
    pub fn from_outlet(outlet: u8) -> Self {
        Self(outlet.saturating_add(1))
    }

    /// Returns the 1-based channel number.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self::FIRST
    }
}

impl TryFrom<u8> for Channel {
    type Error = ValueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Channel> for u8 {
    fn from(channel: Channel) -> Self {
        channel.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
