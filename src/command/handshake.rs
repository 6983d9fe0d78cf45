// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session authentication command.

use uuid::Uuid;

use crate::command::{Action, Command, Envelope};
use crate::types::{AccountCredentials, ApiKey, SequenceId};

/// Command that authenticates the connection (`userOnline`).
///
/// The service does not acknowledge it in a correlatable way; the session
/// waits a fixed settle delay after sending it instead.
///
/// # Examples
///
/// ```
/// use ewelink_session::command::{Command, HandshakeCommand};
/// use ewelink_session::types::{AccountCredentials, SequenceId};
///
/// let account = AccountCredentials::new("key", "token", "app-id");
/// let cmd = HandshakeCommand::new(&account);
/// let envelope = cmd.encode(account.apikey(), SequenceId::new(1));
///
/// assert_eq!(envelope.version, Some(8));
/// assert_eq!(envelope.appid.as_deref(), Some("app-id"));
/// assert_eq!(envelope.nonce.as_ref().map(String::len), Some(8));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeCommand {
    at: String,
    appid: String,
    nonce: String,
}

impl HandshakeCommand {
    /// Protocol version announced by the handshake.
    pub const PROTOCOL_VERSION: u8 = 8;

    /// Creates a handshake for the given account with a fresh nonce.
    #[must_use]
    pub fn new(account: &AccountCredentials) -> Self {
        Self {
            at: account.at().to_string(),
            appid: account.appid().to_string(),
            nonce: nonce(),
        }
    }

    /// Returns the nonce this handshake will carry.
    #[must_use]
    pub fn nonce(&self) -> &str {
        &self.nonce
    }
}

impl Command for HandshakeCommand {
    fn action(&self) -> Action {
        Action::UserOnline
    }

    fn encode(&self, apikey: &ApiKey, sequence: SequenceId) -> Envelope {
        Envelope {
            version: Some(Self::PROTOCOL_VERSION),
            at: Some(self.at.clone()),
            appid: Some(self.appid.clone()),
            nonce: Some(self.nonce.clone()),
            ..Envelope::new(self.action(), apikey, sequence)
        }
    }
}

/// Returns 8 lowercase alphanumeric characters.
pub(crate) fn nonce() -> String {
    Uuid::new_v4().simple().to_string().chars().take(8).collect()
}
