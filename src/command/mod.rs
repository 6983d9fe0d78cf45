// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command definitions and the wire envelope they encode into.
//!
//! Every frame sent over the session is a JSON object called an
//! [`Envelope`]. Commands describe *what* to send; encoding stamps them with
//! the API key, a sequence id and the current timestamp. Encoding is pure and
//! never touches the network.
//!
//! # Available Commands
//!
//! | Command Type | Action | Correlated |
//! |-------------|--------|------------|
//! | [`HandshakeCommand`] | `userOnline` | no, a settle delay follows |
//! | [`QueryCommand`] | `query` | no |
//! | [`UpdateCommand`] | `update` | yes, by `sequence` |
//!
//! # Examples
//!
//! ```
//! use ewelink_session::command::{Action, Command, UpdateCommand};
//! use ewelink_session::types::{ApiKey, SequenceId};
//!
//! let cmd = UpdateCommand::new("1000abcdef", serde_json::json!({"switch": "on"}));
//! let envelope = cmd.encode(&ApiKey::new("key"), SequenceId::new(1));
//!
//! assert_eq!(envelope.action, Action::Update);
//! assert_eq!(envelope.deviceid.as_deref(), Some("1000abcdef"));
//! ```

mod device;
mod handshake;

pub use device::{QueryCommand, UpdateCommand};
pub use handshake::HandshakeCommand;
pub(crate) use handshake::nonce;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ParseError;
use crate::types::{ApiKey, SequenceId, unix_timestamp};

/// User agent reported in every envelope.
pub const USER_AGENT: &str = "app";

/// The `action` field of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Session authentication.
    #[serde(rename = "userOnline")]
    UserOnline,
    /// Push new parameters to a device.
    #[serde(rename = "update")]
    Update,
    /// Request current parameters of a device.
    #[serde(rename = "query")]
    Query,
}

/// A frame sent to the service.
///
/// Fields that a given action does not use are left as `None` and omitted
/// from the JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// What the frame asks the service to do.
    pub action: Action,
    /// Protocol version, handshake only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u8>,
    /// Target device.
    #[serde(
        rename = "deviceid",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub deviceid: Option<String>,
    /// Credential the frame acts under.
    pub apikey: ApiKey,
    /// Correlation key.
    pub sequence: SequenceId,
    /// Unix timestamp in seconds.
    pub ts: i64,
    /// Always [`USER_AGENT`].
    pub user_agent: String,
    /// Session access token, handshake only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<String>,
    /// Application identifier, handshake only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appid: Option<String>,
    /// Random nonce, handshake only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// Parameter payload: an object for updates, a list of names for queries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Envelope {
    /// Creates an envelope with only the fields every action carries.
    #[must_use]
    pub fn new(action: Action, apikey: &ApiKey, sequence: SequenceId) -> Self {
        Self {
            action,
            version: None,
            deviceid: None,
            apikey: apikey.clone(),
            sequence,
            ts: unix_timestamp(),
            user_agent: USER_AGENT.to_string(),
            at: None,
            appid: None,
            nonce: None,
            params: None,
        }
    }

    /// Serializes the envelope to the JSON text sent on the wire.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Json` if serialization fails.
    pub fn to_json(&self) -> Result<String, ParseError> {
        serde_json::to_string(self).map_err(ParseError::Json)
    }

    /// Parses an envelope from JSON text.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Json` if the text is not a valid envelope.
    pub fn from_json(text: &str) -> Result<Self, ParseError> {
        serde_json::from_str(text).map_err(ParseError::Json)
    }
}

/// A command that can be sent over the session.
pub trait Command {
    /// Returns the action this command encodes to.
    fn action(&self) -> Action;

    /// Returns the target device, if any.
    fn device_id(&self) -> Option<&str> {
        None
    }

    /// Returns the sequence requested by the caller, if any.
    ///
    /// When `None`, the session generates a fresh one.
    fn sequence(&self) -> Option<SequenceId> {
        None
    }

    /// Builds the envelope for this command.
    fn encode(&self, apikey: &ApiKey, sequence: SequenceId) -> Envelope;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_wire_names() {
        assert_eq!(
            serde_json::to_string(&Action::UserOnline).unwrap(),
            r#""userOnline""#
        );
        assert_eq!(serde_json::to_string(&Action::Update).unwrap(), r#""update""#);
        assert_eq!(serde_json::to_string(&Action::Query).unwrap(), r#""query""#);
    }

    #[test]
    fn envelope_omits_unused_fields() {
        let envelope = Envelope::new(Action::Query, &ApiKey::new("key"), SequenceId::new(7));
        let value: Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();

        assert_eq!(value["action"], "query");
        assert_eq!(value["apikey"], "key");
        assert_eq!(value["sequence"], 7);
        assert_eq!(value["userAgent"], "app");
        // Unix seconds, not milliseconds
        let ts = value["ts"].as_i64().unwrap();
        assert!((ts - chrono::Utc::now().timestamp()).abs() <= 5);
        for absent in ["version", "deviceid", "at", "appid", "nonce", "params"] {
            assert!(value.get(absent).is_none(), "{absent} should be omitted");
        }
    }

    #[test]
    fn envelope_parses_back() {
        let mut envelope = Envelope::new(Action::Update, &ApiKey::new("key"), SequenceId::new(9));
        envelope.deviceid = Some("1000abcdef".to_string());
        let parsed = Envelope::from_json(&envelope.to_json().unwrap()).unwrap();
        assert_eq!(parsed, envelope);
    }
}
