// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-process transport.
//!
//! [`MemoryTransport::pair`] returns the transport a session uses and a
//! [`MemoryPeer`] that plays the service: it receives every outbound frame
//! and pushes inbound frames.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, broadcast, mpsc};

use super::{INBOUND_CAPACITY, Transport};
use crate::error::ProtocolError;

#[derive(Debug)]
struct Shared {
    closed: AtomicBool,
    fail_sends: AtomicBool,
}

/// Transport backed by in-process channels.
#[derive(Debug)]
pub struct MemoryTransport {
    outbound: mpsc::UnboundedSender<String>,
    inbound: broadcast::Sender<String>,
    shared: Arc<Shared>,
}

/// The service side of a [`MemoryTransport`].
#[derive(Debug)]
pub struct MemoryPeer {
    outbound: Mutex<mpsc::UnboundedReceiver<String>>,
    inbound: broadcast::Sender<String>,
    shared: Arc<Shared>,
}

impl MemoryTransport {
    /// Creates a connected transport and its peer.
    #[must_use]
    pub fn pair() -> (Self, MemoryPeer) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound, _) = broadcast::channel(INBOUND_CAPACITY);
        let shared = Arc::new(Shared {
            closed: AtomicBool::new(false),
            fail_sends: AtomicBool::new(false),
        });

        let transport = Self {
            outbound: outbound_tx,
            inbound: inbound.clone(),
            shared: Arc::clone(&shared),
        };
        let peer = MemoryPeer {
            outbound: Mutex::new(outbound_rx),
            inbound,
            shared,
        };
        (transport, peer)
    }
}

impl Transport for MemoryTransport {
    async fn send(&self, payload: String) -> Result<(), ProtocolError> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(ProtocolError::SendFailed("transport is closed".to_string()));
        }
        if self.shared.fail_sends.load(Ordering::Acquire) {
            return Err(ProtocolError::SendFailed("send rejected".to_string()));
        }
        self.outbound
            .send(payload)
            .map_err(|_| ProtocolError::ChannelClosed("memory peer dropped".to_string()))
    }

    async fn close(&self) -> Result<(), ProtocolError> {
        self.shared.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<String> {
        self.inbound.subscribe()
    }
}

impl MemoryPeer {
    /// Waits for the next frame sent by the transport.
    ///
    /// Returns `None` once the transport is dropped and every frame has been
    /// received.
    pub async fn recv(&self) -> Option<String> {
        self.outbound.lock().await.recv().await
    }

    /// Returns the next sent frame if one is already queued.
    pub async fn try_recv(&self) -> Option<String> {
        self.outbound.lock().await.try_recv().ok()
    }

    /// Pushes an inbound frame to every subscriber.
    ///
    /// Returns the number of subscribers that received it.
    pub fn push(&self, frame: impl Into<String>) -> usize {
        self.inbound.send(frame.into()).unwrap_or(0)
    }

    /// Makes subsequent sends fail.
    pub fn fail_sends(&self, fail: bool) {
        self.shared.fail_sends.store(fail, Ordering::Release);
    }

    /// Returns true once the transport has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}
