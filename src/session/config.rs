// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session and command options.

use std::time::Duration;

use crate::types::Channel;

/// Timing configuration of a session.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use ewelink_session::session::SessionConfig;
///
/// let config = SessionConfig::new()
///     .with_timeout(Duration::from_secs(10))
///     .with_handshake_settle_delay(Duration::ZERO);
/// assert_eq!(config.timeout(), Duration::from_secs(10));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    timeout: Duration,
    handshake_settle_delay: Duration,
}

impl SessionConfig {
    /// Default time to wait for an acknowledgment.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);
    /// Default pause after the handshake.
    pub const DEFAULT_HANDSHAKE_SETTLE_DELAY: Duration = Duration::from_millis(1000);

    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the acknowledgment timeout of correlated commands.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the pause observed after sending the handshake.
    #[must_use]
    pub fn with_handshake_settle_delay(mut self, delay: Duration) -> Self {
        self.handshake_settle_delay = delay;
        self
    }

    /// Returns the acknowledgment timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the handshake settle delay.
    #[must_use]
    pub fn handshake_settle_delay(&self) -> Duration {
        self.handshake_settle_delay
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Self::DEFAULT_TIMEOUT,
            handshake_settle_delay: Self::DEFAULT_HANDSHAKE_SETTLE_DELAY,
        }
    }
}

/// Options of power and parameter commands.
///
/// # Examples
///
/// ```
/// use ewelink_session::session::PowerOptions;
/// use ewelink_session::types::Channel;
///
/// let options = PowerOptions::new().with_channel(Channel::new(2).unwrap()).shared();
/// assert_eq!(options.channel.value(), 2);
/// assert!(options.shared);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PowerOptions {
    /// Target channel of multi-channel devices.
    pub channel: Channel,
    /// Report every channel instead of one (reads only).
    pub all_channels: bool,
    /// Act with the owner's API key, for devices shared with this account.
    pub shared: bool,
}

impl PowerOptions {
    /// Creates options targeting channel 1 with the account's own key.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Targets the given channel.
    #[must_use]
    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    /// Reports every channel.
    #[must_use]
    pub fn all_channels(mut self) -> Self {
        self.all_channels = true;
        self
    }

    /// Uses the owner's key.
    #[must_use]
    pub fn shared(mut self) -> Self {
        self.shared = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.handshake_settle_delay(), Duration::from_secs(1));

        let options = PowerOptions::default();
        assert_eq!(options.channel, Channel::FIRST);
        assert!(!options.all_channels);
        assert!(!options.shared);
    }
}
