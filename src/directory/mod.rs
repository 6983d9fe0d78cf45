// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device lookup.
//!
//! Power commands need the device's current parameters, and shared devices
//! need the owner's API key. A [`DeviceDirectory`] supplies both as a
//! [`DeviceRecord`].
//!
//! # Directories
//!
//! - [`HttpDirectory`]: the service's REST API (feature `http`)
//! - [`StaticDirectory`]: an in-memory map

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::{HttpDirectory, HttpDirectoryConfig};

use std::collections::HashMap;
use std::future::Future;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DeviceError, Error};
use crate::state::DeviceParams;
use crate::types::ApiKey;

/// Source of device records.
pub trait DeviceDirectory: Send + Sync + 'static {
    /// Looks up one device.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::NotFound` for an unknown device, or the error of
    /// the underlying lookup.
    fn get_device(&self, device_id: &str) -> impl Future<Output = Result<DeviceRecord, Error>> + Send;
}

/// What the service knows about a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Device identifier.
    #[serde(default)]
    pub deviceid: String,
    /// API key of the account owning the device.
    pub apikey: ApiKey,
    /// Current device parameters.
    #[serde(default)]
    pub params: DeviceParams,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Whether the device is connected to the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online: Option<bool>,
    /// All other fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DeviceRecord {
    /// Creates a record.
    #[must_use]
    pub fn new(deviceid: impl Into<String>, apikey: impl Into<ApiKey>, params: DeviceParams) -> Self {
        Self {
            deviceid: deviceid.into(),
            apikey: apikey.into(),
            params,
            name: None,
            online: None,
            extra: Map::new(),
        }
    }
}

/// Directory over a fixed set of records.
///
/// # Examples
///
/// ```
/// use ewelink_session::directory::{DeviceDirectory, DeviceRecord, StaticDirectory};
/// use ewelink_session::state::DeviceParams;
/// use ewelink_session::types::PowerState;
///
/// # #[tokio::main]
/// # async fn main() -> ewelink_session::Result<()> {
/// let directory = StaticDirectory::new();
/// directory.insert(DeviceRecord::new("1000abcdef", "owner-key", DeviceParams::single(PowerState::Off)));
///
/// let record = directory.get_device("1000abcdef").await?;
/// assert_eq!(record.apikey.as_str(), "owner-key");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct StaticDirectory {
    devices: RwLock<HashMap<String, DeviceRecord>>,
}

impl StaticDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a record, keyed by its `deviceid`.
    pub fn insert(&self, record: DeviceRecord) -> Option<DeviceRecord> {
        self.devices.write().insert(record.deviceid.clone(), record)
    }

    /// Replaces the parameters of a known device.
    ///
    /// Returns false if the device is unknown.
    pub fn update_params(&self, device_id: &str, params: DeviceParams) -> bool {
        match self.devices.write().get_mut(device_id) {
            Some(record) => {
                record.params = params;
                true
            }
            None => false,
        }
    }

    /// Removes a record.
    pub fn remove(&self, device_id: &str) -> Option<DeviceRecord> {
        self.devices.write().remove(device_id)
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    /// Returns true if the directory holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }
}

impl FromIterator<DeviceRecord> for StaticDirectory {
    fn from_iter<I: IntoIterator<Item = DeviceRecord>>(iter: I) -> Self {
        let devices = iter
            .into_iter()
            .map(|record| (record.deviceid.clone(), record))
            .collect();
        Self {
            devices: RwLock::new(devices),
        }
    }
}

impl DeviceDirectory for StaticDirectory {
    async fn get_device(&self, device_id: &str) -> Result<DeviceRecord, Error> {
        self.devices
            .read()
            .get(device_id)
            .cloned()
            .ok_or_else(|| DeviceError::NotFound(device_id.to_string()).into())
    }
}
