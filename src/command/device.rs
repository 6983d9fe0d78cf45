// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device query and update commands.

use serde_json::Value;

use crate::command::{Action, Command, Envelope};
use crate::types::{ApiKey, SequenceId};

/// Command requesting the current parameters of a device.
///
/// The requested fields are named explicitly and sent as a JSON list.
///
/// # Examples
///
/// ```
/// use ewelink_session::command::{Command, QueryCommand};
/// use ewelink_session::types::{ApiKey, SequenceId};
///
/// let cmd = QueryCommand::power("1000abcdef");
/// let envelope = cmd.encode(&ApiKey::new("key"), SequenceId::new(1));
/// assert_eq!(envelope.params, Some(serde_json::json!(["switch", "switches"])));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryCommand {
    device_id: String,
    fields: Vec<String>,
}

impl QueryCommand {
    /// Creates a query for the given fields.
    #[must_use]
    pub fn new<I, S>(device_id: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            device_id: device_id.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a query for the power fields of single- and multi-channel devices.
    #[must_use]
    pub fn power(device_id: impl Into<String>) -> Self {
        Self::new(device_id, ["switch", "switches"])
    }

    /// Returns the requested field names.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

impl Command for QueryCommand {
    fn action(&self) -> Action {
        Action::Query
    }

    fn device_id(&self) -> Option<&str> {
        Some(&self.device_id)
    }

    fn encode(&self, apikey: &ApiKey, sequence: SequenceId) -> Envelope {
        Envelope {
            deviceid: Some(self.device_id.clone()),
            params: Some(Value::from(self.fields.clone())),
            ..Envelope::new(self.action(), apikey, sequence)
        }
    }
}

/// Command pushing new parameters to a device.
///
/// The acknowledgment echoes the envelope's `sequence`, which is how the
/// session correlates it.
///
/// # Examples
///
/// ```
/// use ewelink_session::command::{Command, UpdateCommand};
/// use ewelink_session::types::{ApiKey, SequenceId};
///
/// let cmd = UpdateCommand::new("1000abcdef", serde_json::json!({"switch": "off"}))
///     .with_sequence(SequenceId::new(42));
/// assert_eq!(cmd.sequence(), Some(SequenceId::new(42)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCommand {
    device_id: String,
    params: Value,
    sequence: Option<SequenceId>,
}

impl UpdateCommand {
    /// Creates an update with the given parameter object.
    #[must_use]
    pub fn new(device_id: impl Into<String>, params: Value) -> Self {
        Self {
            device_id: device_id.into(),
            params,
            sequence: None,
        }
    }

    /// Pins the sequence instead of letting the session generate one.
    #[must_use]
    pub fn with_sequence(mut self, sequence: SequenceId) -> Self {
        self.sequence = Some(sequence);
        self
    }

    /// Returns the parameter payload.
    #[must_use]
    pub fn params(&self) -> &Value {
        &self.params
    }
}

impl Command for UpdateCommand {
    fn action(&self) -> Action {
        Action::Update
    }

    fn device_id(&self) -> Option<&str> {
        Some(&self.device_id)
    }

    fn sequence(&self) -> Option<SequenceId> {
        self.sequence
    }

    fn encode(&self, apikey: &ApiKey, sequence: SequenceId) -> Envelope {
        Envelope {
            deviceid: Some(self.device_id.clone()),
            params: Some(self.params.clone()),
            ..Envelope::new(self.action(), apikey, sequence)
        }
    }
}
