// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the REST device directory using wiremock.

#![cfg(feature = "http")]

use ewelink_session::directory::{DeviceDirectory, HttpDirectory, HttpDirectoryConfig};
use ewelink_session::protocol::MemoryTransport;
use ewelink_session::types::PowerState;
use ewelink_session::{AccountCredentials, DeviceError, Error, PowerOptions, ProtocolError, Session};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn directory(server: &MockServer) -> HttpDirectory {
    HttpDirectoryConfig::new(server.uri(), "token", "app-id")
        .into_directory()
        .unwrap()
}

// ============================================================================
// Device lookup
// ============================================================================

mod lookup {
    use super::*;

    #[tokio::test]
    async fn fetches_device_record() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/user/device/1000abcdef"))
            .and(header("Authorization", "Bearer token"))
            .and(query_param("deviceid", "1000abcdef"))
            .and(query_param("appid", "app-id"))
            .and(query_param("version", "8"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "deviceid": "1000abcdef",
                "apikey": "owner-key",
                "name": "Desk lamp",
                "online": true,
                "params": {"switch": "off", "fwVersion": "3.5.0"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let record = directory(&server).get_device("1000abcdef").await.unwrap();

        assert_eq!(record.apikey.as_str(), "owner-key");
        assert_eq!(record.name.as_deref(), Some("Desk lamp"));
        assert_eq!(record.params.switch, Some(PowerState::Off));
        assert_eq!(record.params.extra["fwVersion"], "3.5.0");
    }

    #[tokio::test]
    async fn device_id_is_escaped_into_one_segment() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/user/device/a%2Fb%3Fc"))
            .and(query_param("deviceid", "a/b?c"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "deviceid": "a/b?c",
                "apikey": "owner-key",
                "params": {}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let record = directory(&server).get_device("a/b?c").await.unwrap();
        assert_eq!(record.deviceid, "a/b?c");
    }

    #[tokio::test]
    async fn error_body_maps_to_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"error": 404, "msg": "device does not exist"})),
            )
            .mount(&server)
            .await;

        let result = directory(&server).get_device("ghost").await;
        assert!(matches!(
            result,
            Err(Error::Device(DeviceError::NotFound(id))) if id == "ghost"
        ));
    }

    #[tokio::test]
    async fn unauthorized_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let result = directory(&server).get_device("1000abcdef").await;
        assert!(matches!(
            result,
            Err(Error::Protocol(ProtocolError::AuthenticationFailed))
        ));
    }

    #[tokio::test]
    async fn server_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = directory(&server).get_device("1000abcdef").await;
        assert!(matches!(
            result,
            Err(Error::Protocol(ProtocolError::ConnectionFailed(_)))
        ));
    }

    #[tokio::test]
    async fn missing_apikey_is_a_parse_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"params": {}})),
            )
            .mount(&server)
            .await;

        let result = directory(&server).get_device("1000abcdef").await;
        assert!(matches!(result, Err(Error::Parse(_))));
    }
}

// ============================================================================
// Session over the REST directory
// ============================================================================

mod session {
    use super::*;

    #[tokio::test]
    async fn power_state_reads_through_directory() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/user/device/1000abcdef"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "deviceid": "1000abcdef",
                "apikey": "owner-key",
                "params": {"switches": [
                    {"switch": "on", "outlet": 0},
                    {"switch": "off", "outlet": 1}
                ]}
            })))
            .mount(&server)
            .await;

        let (transport, _peer) = MemoryTransport::pair();
        let account = AccountCredentials::new("own-key", "token", "app-id");
        let directory = HttpDirectoryConfig::for_account(server.uri(), &account)
            .into_directory()
            .unwrap();
        let session = Session::builder(transport, directory, account).build_without_handshake();

        let options = PowerOptions::new().with_channel(ewelink_session::Channel::new(2).unwrap());
        let report = session.power_state("1000abcdef", options).await.unwrap();
        assert_eq!(report.single_state(), Some(PowerState::Off));
    }
}
