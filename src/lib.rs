// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `ewelink_session` - control eWeLink devices over a WebSocket session.
//!
//! The service accepts commands on one persistent connection and answers
//! them asynchronously on the same connection. This library encodes the
//! commands, stamps each with a unique sequence id, and matches the
//! acknowledgments back to the callers waiting for them.
//!
//! # Supported Features
//!
//! - **Power control**: single-channel and multi-channel devices, with the
//!   owner's key for shared devices
//! - **Generic updates**: push arbitrary device parameters
//! - **Status reads**: normalized power state from the device directory
//! - **Correlation**: concurrent commands, out-of-order acknowledgments,
//!   per-command timeouts
//!
//! # Quick Start
//!
//! ```no_run
//! use ewelink_session::Session;
//! use ewelink_session::directory::HttpDirectoryConfig;
//! use ewelink_session::protocol::WebSocketTransport;
//! use ewelink_session::session::PowerOptions;
//! use ewelink_session::types::{AccountCredentials, Channel, PowerState};
//!
//! #[tokio::main]
//! async fn main() -> ewelink_session::Result<()> {
//!     let account = AccountCredentials::new("apikey", "access-token", "app-id");
//!     let transport =
//!         WebSocketTransport::connect("wss://eu-pconnect3.coolkit.cc:8080/api/ws").await?;
//!     let directory =
//!         HttpDirectoryConfig::for_account("https://eu-api.coolkit.cc:8080", &account)
//!             .into_directory()?;
//!
//!     // Sends the handshake and waits the settle delay
//!     let session = Session::builder(transport, directory, account).build().await?;
//!
//!     // Second outlet of a multi-channel switch
//!     let options = PowerOptions::new().with_channel(Channel::new(2)?);
//!     let result = session.set_power_state("1000abcdef", PowerState::On, options).await?;
//!
//!     // Timeouts settle the result instead of failing
//!     if !result.is_ok() {
//!         println!("not applied: {:?}", result.message);
//!     }
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `websocket` (default): [`protocol::WebSocketTransport`]
//! - `http` (default): [`directory::HttpDirectory`]

pub mod command;
pub mod directory;
pub mod error;
pub mod protocol;
pub mod response;
pub mod session;
pub mod state;
pub mod types;

pub use command::{Command, Envelope, HandshakeCommand, QueryCommand, UpdateCommand};
pub use directory::{DeviceDirectory, DeviceRecord, StaticDirectory};
pub use error::{DeviceError, Error, ParseError, ProtocolError, Result, ValueError};
pub use protocol::{CorrelationRegistry, MemoryPeer, MemoryTransport, PendingResponse, Transport};
pub use response::{CommandResult, CommandStatus, PowerStateReport};
pub use session::{PowerOptions, Session, SessionBuilder, SessionConfig};
pub use types::{AccountCredentials, ApiKey, Channel, PowerState, SequenceId};

#[cfg(feature = "http")]
pub use directory::{HttpDirectory, HttpDirectoryConfig};
#[cfg(feature = "websocket")]
pub use protocol::WebSocketTransport;
