// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Account and device credentials.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An API key identifying the account (or, for shared devices, the owning
/// account) a command acts on behalf of.
///
/// The `Debug` output is redacted so keys do not end up in logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wraps an API key string.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(4).collect();
        write!(f, "ApiKey({prefix}...)")
    }
}

impl From<&str> for ApiKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for ApiKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Everything the session needs to authenticate as an account.
#[derive(Clone)]
pub struct AccountCredentials {
    apikey: ApiKey,
    at: String,
    appid: String,
}

impl AccountCredentials {
    /// Creates account credentials.
    ///
    /// # Arguments
    ///
    /// * `apikey` - The account API key
    /// * `at` - The session access token obtained at login
    /// * `appid` - The application identifier registered with the service
    #[must_use]
    pub fn new(apikey: impl Into<ApiKey>, at: impl Into<String>, appid: impl Into<String>) -> Self {
        Self {
            apikey: apikey.into(),
            at: at.into(),
            appid: appid.into(),
        }
    }

    /// Returns the account API key.
    #[must_use]
    pub fn apikey(&self) -> &ApiKey {
        &self.apikey
    }

    /// Returns the access token.
    #[must_use]
    pub fn at(&self) -> &str {
        &self.at
    }

    /// Returns the application identifier.
    #[must_use]
    pub fn appid(&self) -> &str {
        &self.appid
    }
}

impl fmt::Debug for AccountCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountCredentials")
            .field("apikey", &self.apikey)
            .field("at", &"<redacted>")
            .field("appid", &self.appid)
            .finish()
    }
}
