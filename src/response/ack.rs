// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inbound frames and the result a correlated command settles with.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DeviceError, Error, ParseError, ProtocolError};
use crate::types::SequenceId;

/// Message reported when no acknowledgment arrives in time.
pub const TIMEOUT_MESSAGE: &str = "timed out waiting for response";

/// Message reported when the registry is torn down under a waiting request.
pub const ABANDONED_MESSAGE: &str = "correlation abandoned";

/// A frame received from the service.
///
/// Only the fields needed for correlation are typed; everything else is
/// ignored. Acknowledgments carry `error` (0 on success) and `reason`.
///
/// # Examples
///
/// ```
/// use ewelink_session::response::InboundMessage;
///
/// let msg = InboundMessage::parse(
///     r#"{"error":0,"deviceid":"1000abcdef","apikey":"k","sequence":"1700000000123"}"#,
/// ).unwrap();
/// assert!(msg.to_result().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InboundMessage {
    /// Device the frame concerns.
    #[serde(default)]
    pub deviceid: Option<String>,
    /// Echoed correlation key.
    #[serde(default)]
    pub sequence: Option<SequenceId>,
    /// Result code, 0 on success.
    #[serde(default)]
    pub error: Option<i64>,
    /// Human-readable explanation supplied by the service.
    #[serde(default)]
    pub reason: Option<String>,
    /// Action of unsolicited frames (e.g. `update` pushed by a device).
    #[serde(default)]
    pub action: Option<String>,
    /// Parameters of unsolicited frames.
    #[serde(default)]
    pub params: Option<Value>,
}

impl InboundMessage {
    /// Parses a raw text frame.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Json` if the frame is not a JSON object with
    /// well-typed correlation fields.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        serde_json::from_str(raw).map_err(ParseError::Json)
    }

    /// Returns the `(deviceid, sequence)` pair used for correlation, if both
    /// are present.
    #[must_use]
    pub fn correlation_key(&self) -> Option<(&str, SequenceId)> {
        Some((self.deviceid.as_deref()?, self.sequence?))
    }

    /// Converts the acknowledgment into a command result.
    ///
    /// Only `error == 0` counts as success; a missing code is an error.
    #[must_use]
    pub fn to_result(&self) -> CommandResult {
        let status = if self.error == Some(0) {
            CommandStatus::Ok
        } else {
            CommandStatus::Error
        };
        CommandResult {
            status,
            message: self.reason.clone(),
            timed_out_after: None,
        }
    }
}

/// Outcome category of a correlated command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    /// The service accepted the command.
    Ok,
    /// The service rejected it, or no acknowledgment arrived.
    Error,
}

/// The value every correlated command settles with.
///
/// Timeouts are reported here as an error-shaped result rather than as an
/// `Err`, so callers always see the same `{ status, message }` shape.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use ewelink_session::response::{CommandResult, CommandStatus};
///
/// let result = CommandResult::timed_out(Duration::from_secs(5));
/// assert_eq!(result.status, CommandStatus::Error);
/// assert_eq!(result.message.as_deref(), Some("timed out waiting for response"));
/// assert!(result.is_timeout());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    /// Outcome category.
    pub status: CommandStatus,
    /// Reason supplied by the service, or the timeout message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip)]
    timed_out_after: Option<Duration>,
}

impl CommandResult {
    /// Creates a successful result.
    #[must_use]
    pub fn ok(message: Option<String>) -> Self {
        Self {
            status: CommandStatus::Ok,
            message,
            timed_out_after: None,
        }
    }

    /// Creates a failed result with the given message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Error,
            message: Some(message.into()),
            timed_out_after: None,
        }
    }

    /// Creates the result reported when no acknowledgment arrived in time.
    #[must_use]
    pub fn timed_out(after: Duration) -> Self {
        Self {
            timed_out_after: Some(after),
            ..Self::error(TIMEOUT_MESSAGE)
        }
    }

    /// Returns true if the service accepted the command.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == CommandStatus::Ok
    }

    /// Returns true if the result was produced by the timeout path.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.timed_out_after.is_some()
    }

    /// Converts the result into a `Result`, for callers who prefer `?`.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Timeout` for a timed-out command and
    /// `DeviceError::CommandRejected` for any other failure.
    pub fn into_result(self) -> Result<Option<String>, Error> {
        if let Some(after) = self.timed_out_after {
            #[allow(clippy::cast_possible_truncation)]
            return Err(ProtocolError::Timeout(after.as_millis() as u64).into());
        }
        match self.status {
            CommandStatus::Ok => Ok(self.message),
            CommandStatus::Error => Err(DeviceError::CommandRejected(
                self.message.unwrap_or_else(|| "no reason given".to_string()),
            )
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parse_acknowledgment() {
        let msg = InboundMessage::parse(
            r#"{"error":0,"deviceid":"dev","apikey":"k","sequence":"1700000000123"}"#,
        )
        .unwrap();
        assert_eq!(
            msg.correlation_key(),
            Some(("dev", SequenceId::new(1_700_000_000_123)))
        );
        assert_eq!(msg.to_result(), CommandResult::ok(None));
    }

    #[test]
    fn nonzero_error_carries_reason() {
        let msg = InboundMessage::parse(
            r#"{"error":504,"deviceid":"dev","sequence":1,"reason":"device offline"}"#,
        )
        .unwrap();
        let result = msg.to_result();
        assert_eq!(result.status, CommandStatus::Error);
        assert_eq!(result.message.as_deref(), Some("device offline"));
        assert!(!result.is_timeout());
    }

    #[test]
    fn missing_error_code_is_an_error() {
        let msg = InboundMessage::parse(r#"{"deviceid":"dev","sequence":1}"#).unwrap();
        assert_eq!(msg.to_result().status, CommandStatus::Error);
    }

    #[test]
    fn unsolicited_update_has_no_correlation_key() {
        let msg = InboundMessage::parse(
            r#"{"action":"update","deviceid":"dev","params":{"switch":"on"}}"#,
        )
        .unwrap();
        assert!(msg.correlation_key().is_none());
        assert_eq!(msg.params, Some(json!({"switch": "on"})));
    }

    #[test]
    fn non_object_frames_fail_to_parse() {
        assert!(InboundMessage::parse("pong").is_err());
        assert!(InboundMessage::parse("[1,2]").is_err());
        assert!(InboundMessage::parse("").is_err());
    }

    #[test]
    fn result_serializes_to_status_message_shape() {
        let value = serde_json::to_value(CommandResult::timed_out(Duration::from_secs(5))).unwrap();
        assert_eq!(
            value,
            json!({"status": "error", "message": "timed out waiting for response"})
        );
        let value = serde_json::to_value(CommandResult::ok(None)).unwrap();
        assert_eq!(value, json!({"status": "ok"}));
    }

    #[test]
    fn into_result_maps_failures() {
        assert_eq!(
            CommandResult::ok(Some("done".into())).into_result().unwrap(),
            Some("done".to_string())
        );
        assert!(matches!(
            CommandResult::timed_out(Duration::from_millis(5000)).into_result(),
            Err(Error::Protocol(ProtocolError::Timeout(5000)))
        ));
        assert!(matches!(
            CommandResult::error("offline").into_result(),
            Err(Error::Device(DeviceError::CommandRejected(reason))) if reason == "offline"
        ));
    }
}
