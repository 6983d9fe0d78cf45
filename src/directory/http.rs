// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device directory backed by the service's REST API.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde_json::Value;

use super::{DeviceDirectory, DeviceRecord};
use crate::command::{HandshakeCommand, nonce};
use crate::error::{DeviceError, Error, ParseError, ProtocolError};
use crate::types::{AccountCredentials, unix_timestamp};

// ============================================================================
// HttpDirectoryConfig
// ============================================================================

/// Configuration for an [`HttpDirectory`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use ewelink_session::directory::HttpDirectoryConfig;
///
/// let config = HttpDirectoryConfig::new("https://eu-api.coolkit.cc:8080", "token", "app-id")
///     .with_timeout(Duration::from_secs(5));
/// assert_eq!(config.base_url(), "https://eu-api.coolkit.cc:8080");
/// ```
#[derive(Debug, Clone)]
pub struct HttpDirectoryConfig {
    base_url: String,
    at: String,
    appid: String,
    timeout: Duration,
}

impl HttpDirectoryConfig {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a configuration for the given API root and session token.
    #[must_use]
    pub fn new(base_url: impl Into<String>, at: impl Into<String>, appid: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            at: at.into(),
            appid: appid.into(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Creates a configuration using the token and application id of an
    /// account.
    #[must_use]
    pub fn for_account(base_url: impl Into<String>, account: &AccountCredentials) -> Self {
        Self::new(base_url, account.at(), account.appid())
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the API root.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Creates an `HttpDirectory` from this configuration.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidAddress` for a base URL that is not an
    /// absolute HTTP(S) URL and `ProtocolError::Http` if the client cannot be
    /// created.
    pub fn into_directory(self) -> Result<HttpDirectory, ProtocolError> {
        let base_url = Url::parse(&self.base_url)
            .map_err(|e| ProtocolError::InvalidAddress(format!("{}: {e}", self.base_url)))?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(ProtocolError::InvalidAddress(self.base_url));
        }

        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(ProtocolError::Http)?;

        Ok(HttpDirectory {
            base_url,
            at: self.at,
            appid: self.appid,
            client,
        })
    }
}

// ============================================================================
// HttpDirectory
// ============================================================================

/// Looks devices up with `GET /api/user/device/{deviceid}`.
#[derive(Debug, Clone)]
pub struct HttpDirectory {
    base_url: Url,
    at: String,
    appid: String,
    client: Client,
}

impl HttpDirectory {
    /// Returns the API root.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the lookup URL of a device, with the id escaped as a single
    /// path segment.
    fn device_url(&self, device_id: &str) -> Result<Url, ProtocolError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ProtocolError::InvalidAddress(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["api", "user", "device", device_id]);
        Ok(url)
    }
}

impl DeviceDirectory for HttpDirectory {
    async fn get_device(&self, device_id: &str) -> Result<DeviceRecord, Error> {
        let url = self.device_url(device_id)?;
        let ts = unix_timestamp().to_string();
        let nonce = nonce();
        let version = HandshakeCommand::PROTOCOL_VERSION.to_string();

        tracing::debug!(url = %url, device = %device_id, "Fetching device record");

        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&self.at)
            .query(&[
                ("deviceid", device_id),
                ("appid", self.appid.as_str()),
                ("nonce", nonce.as_str()),
                ("ts", ts.as_str()),
                ("version", version.as_str()),
            ])
            .send()
            .await
            .map_err(ProtocolError::Http)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ProtocolError::AuthenticationFailed.into());
        }
        if !status.is_success() {
            return Err(ProtocolError::ConnectionFailed(format!("HTTP {status} from {url}")).into());
        }

        let body: Value = response.json().await.map_err(ProtocolError::Http)?;
        if let Some(code) = body.get("error").and_then(Value::as_i64).filter(|&c| c != 0) {
            let msg = body.get("msg").and_then(Value::as_str).unwrap_or_default();
            tracing::debug!(device = %device_id, code, msg, "Device lookup rejected");
            return Err(match code {
                404 | 405 => DeviceError::NotFound(device_id.to_string()).into(),
                401 | 406 => ProtocolError::AuthenticationFailed.into(),
                _ => DeviceError::CommandRejected(format!("error {code}: {msg}")).into(),
            });
        }

        let mut record: DeviceRecord = serde_json::from_value(body).map_err(ParseError::Json)?;
        if record.deviceid.is_empty() {
            record.deviceid = device_id.to_string();
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = HttpDirectoryConfig::new("https://api.example.com/", "t", "a");
        assert_eq!(config.base_url(), "https://api.example.com");
        assert_eq!(config.timeout(), HttpDirectoryConfig::DEFAULT_TIMEOUT);
    }

    #[test]
    fn config_from_account() {
        let account = AccountCredentials::new("key", "token", "app");
        let directory = HttpDirectoryConfig::for_account("http://localhost:8080", &account)
            .into_directory()
            .unwrap();
        assert_eq!(directory.base_url().as_str(), "http://localhost:8080/");
    }

    #[test]
    fn device_id_is_one_path_segment() {
        let directory = HttpDirectoryConfig::new("http://localhost:8080/prefix", "t", "a")
            .into_directory()
            .unwrap();
        let url = directory.device_url("a/b?c#d").unwrap();
        assert_eq!(url.path(), "/prefix/api/user/device/a%2Fb%3Fc%23d");
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
    }

    #[test]
    fn rejects_non_http_base_url() {
        let result = HttpDirectoryConfig::new("ftp://example.com", "t", "a").into_directory();
        assert!(matches!(result, Err(ProtocolError::InvalidAddress(_))));
    }
}
