// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the session library.
//!
//! Failures are grouped by where they originate: value validation, the
//! underlying connection, JSON parsing, and device-level rejections.
//!
//! A correlated command that receives no acknowledgment in time is *not* an
//! error here. It settles with an error-shaped
//! [`CommandResult`](crate::response::CommandResult) instead, and callers can
//! opt into `?` with [`CommandResult::into_result`](crate::response::CommandResult::into_result).

use thiserror::Error;

use crate::types::SequenceId;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred on the connection or the device directory.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred while parsing a message.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Error reported for a specific device.
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    /// The session has been closed.
    #[error("session is not connected")]
    NotConnected,
}

/// Errors related to value validation.
///
/// These are always raised before any network traffic happens.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// The requested power state is not one of the accepted values.
    #[error("invalid power state: {0}")]
    InvalidPowerState(String),

    /// The requested channel does not exist on the device.
    #[error("invalid channel {channel}: device has {available} channel(s)")]
    InvalidChannel {
        /// The 1-based channel that was requested.
        channel: u8,
        /// Number of channels the device reports.
        available: usize,
    },
}

/// Errors related to the connection and the device directory.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// WebSocket connection or frame error.
    #[cfg(feature = "websocket")]
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// HTTP request failed.
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Connecting to the service failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The transport rejected an outbound frame.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// No acknowledgment arrived in time.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// Invalid URL or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The service refused the session token.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Internal channel was closed.
    #[error("channel closed: {0}")]
    ChannelClosed(String),

    /// A request with this sequence is already waiting for its acknowledgment.
    #[error("sequence {0} is already pending")]
    DuplicateSequence(SequenceId),
}

/// Errors related to parsing messages.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing or serialization failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors related to a specific device.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The directory does not know the device.
    #[error("device not found: {0}")]
    NotFound(String),

    /// Command was rejected by the service.
    #[error("command rejected: {0}")]
    CommandRejected(String),

    /// An all-channels query was made against a single-channel device.
    #[error("device does not report multiple channels")]
    NotMultiChannel,

    /// The device parameters carry neither `switch` nor `switches`.
    #[error("device parameters carry no power state")]
    MissingPowerState,
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_channel_display() {
        let err = ValueError::InvalidChannel {
            channel: 4,
            available: 2,
        };
        assert_eq!(err.to_string(), "invalid channel 4: device has 2 channel(s)");
    }

    #[test]
    fn error_from_value_error() {
        let value_err = ValueError::InvalidPowerState("toggle".to_string());
        let err: Error = value_err.into();
        assert!(matches!(err, Error::Value(ValueError::InvalidPowerState(s)) if s == "toggle"));
    }

    #[test]
    fn duplicate_sequence_display() {
        let err = ProtocolError::DuplicateSequence(SequenceId::new(1_700_000_000_123));
        assert_eq!(err.to_string(), "sequence 1700000000123 is already pending");
    }

    #[test]
    fn parse_error_from_malformed_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = ParseError::from(json_err).into();
        assert!(matches!(err, Error::Parse(ParseError::Json(_))));
        assert!(err.to_string().starts_with("parse error: JSON parse error"));
    }

    #[test]
    fn device_error_display() {
        let err = DeviceError::NotFound("1000abcdef".to_string());
        assert_eq!(err.to_string(), "device not found: 1000abcdef");
    }
}
