// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Builder for sessions.

use std::time::Duration;

use super::{Session, SessionConfig};
use crate::directory::DeviceDirectory;
use crate::error::Error;
use crate::protocol::Transport;
use crate::types::AccountCredentials;

/// Builder for [`Session`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use ewelink_session::Session;
/// use ewelink_session::directory::StaticDirectory;
/// use ewelink_session::protocol::MemoryTransport;
/// use ewelink_session::types::AccountCredentials;
///
/// # #[tokio::main]
/// # async fn main() -> ewelink_session::Result<()> {
/// let (transport, _peer) = MemoryTransport::pair();
/// let account = AccountCredentials::new("key", "token", "app-id");
///
/// let session = Session::builder(transport, StaticDirectory::new(), account)
///     .with_timeout(Duration::from_secs(3))
///     .with_handshake_settle_delay(Duration::ZERO)
///     .build()
///     .await?;
/// assert!(session.is_connected());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
#[must_use = "builders do nothing unless built"]
pub struct SessionBuilder<T, D> {
    transport: T,
    directory: D,
    account: AccountCredentials,
    config: SessionConfig,
}

impl<T: Transport, D: DeviceDirectory> SessionBuilder<T, D> {
    pub(crate) fn new(transport: T, directory: D, account: AccountCredentials) -> Self {
        Self {
            transport,
            directory,
            account,
            config: SessionConfig::default(),
        }
    }

    /// Replaces the whole timing configuration.
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the acknowledgment timeout of correlated commands.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_timeout(timeout);
        self
    }

    /// Sets the pause observed after the handshake.
    pub fn with_handshake_settle_delay(mut self, delay: Duration) -> Self {
        self.config = self.config.with_handshake_settle_delay(delay);
        self
    }

    /// Starts the session and authenticates it.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the handshake cannot be sent.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub async fn build(self) -> Result<Session<T, D>, Error> {
        let session = self.build_without_handshake();
        session.handshake().await?;
        Ok(session)
    }

    /// Starts the session without sending the handshake.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn build_without_handshake(self) -> Session<T, D> {
        Session::start(self.transport, self.directory, self.account, self.config)
    }
}
