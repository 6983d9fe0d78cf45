// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection plumbing: the transport seam and response correlation.
//!
//! A session talks to the service over one persistent connection. The
//! [`Transport`] trait is the narrow seam to that connection; the
//! [`CorrelationRegistry`] matches acknowledgments arriving on it back to
//! the commands that caused them.
//!
//! # Transports
//!
//! - [`WebSocketTransport`]: `tokio-tungstenite` client (feature `websocket`)
//! - [`MemoryTransport`]: in-process transport with a [`MemoryPeer`] playing
//!   the service, for tests and embedding

mod correlation;
mod memory;
#[cfg(feature = "websocket")]
mod websocket;

pub use correlation::{CorrelationRegistry, PendingResponse};
pub use memory::{MemoryPeer, MemoryTransport};
#[cfg(feature = "websocket")]
pub use websocket::WebSocketTransport;

use std::future::Future;

use tokio::sync::broadcast;

use crate::error::ProtocolError;

/// Capacity of the inbound broadcast channel of the bundled transports.
pub const INBOUND_CAPACITY: usize = 256;

/// A persistent, message-oriented connection to the service.
///
/// Inbound frames are delivered to every receiver returned by
/// [`subscribe`](Self::subscribe), in arrival order. Dropping a receiver
/// removes that listener.
pub trait Transport: Send + Sync + 'static {
    /// Sends one text frame.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the connection rejects the frame.
    fn send(&self, payload: String) -> impl Future<Output = Result<(), ProtocolError>> + Send;

    /// Closes the connection.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the close handshake fails.
    fn close(&self) -> impl Future<Output = Result<(), ProtocolError>> + Send;

    /// Returns a new listener for inbound text frames.
    fn subscribe(&self) -> broadcast::Receiver<String>;
}
