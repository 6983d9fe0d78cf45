// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! WebSocket transport.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::{INBOUND_CAPACITY, Transport};
use crate::error::ProtocolError;

type Stream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Transport over a `tokio-tungstenite` WebSocket.
///
/// A background task reads the socket and forwards every text frame to the
/// subscribers; outbound frames are written through a shared sink.
///
/// # Examples
///
/// ```no_run
/// use ewelink_session::protocol::WebSocketTransport;
///
/// # async fn example() -> ewelink_session::Result<()> {
/// let transport = WebSocketTransport::connect("wss://eu-pconnect3.coolkit.cc:8080/api/ws").await?;
/// # Ok(())
/// # }
/// ```
pub struct WebSocketTransport {
    writer: Mutex<SplitSink<Stream, Message>>,
    inbound: broadcast::Sender<String>,
    reader: JoinHandle<()>,
}

impl WebSocketTransport {
    /// Opens a WebSocket connection.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidAddress` for a non-WebSocket URL and
    /// `ProtocolError::WebSocket` if the connection cannot be established.
    pub async fn connect(url: &str) -> Result<Self, ProtocolError> {
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(ProtocolError::InvalidAddress(url.to_string()));
        }

        tracing::debug!(url = %url, "Connecting to WebSocket");
        let (stream, response) = tokio_tungstenite::connect_async(url).await?;
        tracing::info!(url = %url, status = %response.status(), "WebSocket connected");

        let (writer, reader) = stream.split();
        let (inbound, _) = broadcast::channel(INBOUND_CAPACITY);
        let reader = tokio::spawn(read_frames(reader, inbound.clone()));

        Ok(Self {
            writer: Mutex::new(writer),
            inbound,
            reader,
        })
    }
}

impl std::fmt::Debug for WebSocketTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketTransport")
            .field("subscribers", &self.inbound.receiver_count())
            .field("reader_finished", &self.reader.is_finished())
            .finish_non_exhaustive()
    }
}

async fn read_frames(mut reader: SplitStream<Stream>, inbound: broadcast::Sender<String>) {
    while let Some(frame) = reader.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                tracing::trace!(len = text.len(), "WebSocket frame received");
                // No subscribers is not an error.
                let _ = inbound.send(text.as_str().to_owned());
            }
            Ok(Message::Close(frame)) => {
                if let Some(ref cf) = frame {
                    tracing::info!(code = %cf.code, reason = %cf.reason, "WebSocket closed by peer");
                } else {
                    tracing::info!("WebSocket closed by peer");
                }
                return;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "WebSocket read failed");
                return;
            }
        }
    }
    tracing::debug!("WebSocket stream ended");
}

impl Transport for WebSocketTransport {
    async fn send(&self, payload: String) -> Result<(), ProtocolError> {
        tracing::trace!(len = payload.len(), "Sending WebSocket frame");
        self.writer
            .lock()
            .await
            .send(Message::Text(payload.into()))
            .await
            .map_err(ProtocolError::from)
    }

    async fn close(&self) -> Result<(), ProtocolError> {
        let result = self.writer.lock().await.close().await;
        self.reader.abort();
        tracing::debug!("WebSocket transport closed");
        result.map_err(ProtocolError::from)
    }

    fn subscribe(&self) -> broadcast::Receiver<String> {
        self.inbound.subscribe()
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn rejects_non_websocket_url() {
        let result = WebSocketTransport::connect("https://example.com/api/ws").await;
        assert!(matches!(result, Err(ProtocolError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn frames_flow_over_local_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio_tungstenite::accept_async(stream).await.unwrap()
        });

        let transport = WebSocketTransport::connect(&format!("ws://{addr}")).await.unwrap();
        let mut server = server.await.unwrap();
        let mut inbound = transport.subscribe();

        // Outbound payloads go out as text frames
        transport.send("hello".to_string()).await.unwrap();
        match server.next().await {
            Some(Ok(Message::Text(text))) => assert_eq!(text.as_str(), "hello"),
            other => panic!("expected text frame, got {other:?}"),
        }

        // Binary frames are skipped, text frames reach subscribers
        server.send(Message::binary(vec![1u8, 2, 3])).await.unwrap();
        server.send(Message::text("from server")).await.unwrap();
        assert_eq!(inbound.recv().await.unwrap(), "from server");
        assert!(inbound.try_recv().is_err());

        transport.close().await.unwrap();
        match server.next().await {
            Some(Ok(Message::Close(_))) => {}
            other => panic!("expected close frame, got {other:?}"),
        }
    }
}
