// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The session facade.
//!
//! A [`Session`] owns one connection to the service. It authenticates the
//! connection, encodes commands, and waits for the acknowledgment of
//! correlated commands.
//!
//! # Architecture
//!
//! ```text
//!                 ┌───────────────────────────────┐
//!  set_power_state│            Session            │
//!  ──────────────►│ directory ─► resolver ─► cmd  │
//!                 │        register(seq) ─► send  │──► Transport
//!                 │                               │
//!                 │  dispatch task ◄── subscribe ─┼─── inbound frames
//!                 │  registry.dispatch(frame)     │
//!                 └───────────────────────────────┘
//! ```
//!
//! The dispatch task is the only reader of the inbound stream; every
//! correlated request registers in the shared [`CorrelationRegistry`] before
//! its frame is written, so an early acknowledgment is never missed.

mod builder;
mod config;

pub use builder::SessionBuilder;
pub use config::{PowerOptions, SessionConfig};

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::command::{Command, Envelope, HandshakeCommand, QueryCommand, UpdateCommand};
use crate::directory::{DeviceDirectory, DeviceRecord};
use crate::error::Error;
use crate::protocol::{CorrelationRegistry, Transport};
use crate::response::{CommandResult, PowerStateReport};
use crate::state::{new_power_state, power_state_params, power_state_report, specific_channel_state};
use crate::types::{AccountCredentials, ApiKey, PowerState, SequenceGenerator, SequenceId};

/// Connection-scoped state, dropped on [`Session::close`].
#[derive(Debug)]
struct Connection<T> {
    transport: Arc<T>,
    dispatcher: JoinHandle<()>,
    settle_delay: Duration,
}

impl<T> Drop for Connection<T> {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}

/// A live session with the service.
///
/// All methods take `&self`; wrap the session in an `Arc` to issue commands
/// from several tasks. Concurrent correlated commands are told apart only by
/// their sequence ids.
///
/// # Examples
///
/// ```no_run
/// use ewelink_session::Session;
/// use ewelink_session::directory::HttpDirectoryConfig;
/// use ewelink_session::protocol::WebSocketTransport;
/// use ewelink_session::session::PowerOptions;
/// use ewelink_session::types::{AccountCredentials, PowerState};
///
/// # async fn example() -> ewelink_session::Result<()> {
/// let account = AccountCredentials::new("apikey", "access-token", "app-id");
/// let transport = WebSocketTransport::connect("wss://eu-pconnect3.coolkit.cc:8080/api/ws").await?;
/// let directory = HttpDirectoryConfig::for_account("https://eu-api.coolkit.cc:8080", &account)
///     .into_directory()?;
///
/// let session = Session::builder(transport, directory, account).build().await?;
/// let result = session
///     .set_power_state("1000abcdef", PowerState::On, PowerOptions::new())
///     .await?;
/// println!("{:?}: {:?}", result.status, result.message);
/// session.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Session<T, D> {
    connection: RwLock<Option<Connection<T>>>,
    registry: CorrelationRegistry,
    directory: D,
    account: AccountCredentials,
    sequences: SequenceGenerator,
    config: SessionConfig,
}

impl<T: Transport, D: DeviceDirectory> Session<T, D> {
    /// Returns a builder for a session over `transport`.
    pub fn builder(transport: T, directory: D, account: AccountCredentials) -> SessionBuilder<T, D> {
        SessionBuilder::new(transport, directory, account)
    }

    pub(crate) fn start(
        transport: T,
        directory: D,
        account: AccountCredentials,
        config: SessionConfig,
    ) -> Self {
        let registry = CorrelationRegistry::new(config.timeout());
        let dispatcher = spawn_dispatcher(transport.subscribe(), registry.clone());

        tracing::debug!(
            timeout_ms = config.timeout().as_millis(),
            settle_ms = config.handshake_settle_delay().as_millis(),
            "Session started"
        );

        Self {
            connection: RwLock::new(Some(Connection {
                transport: Arc::new(transport),
                dispatcher,
                settle_delay: config.handshake_settle_delay(),
            })),
            registry,
            directory,
            account,
            sequences: SequenceGenerator::new(),
            config,
        }
    }

    // ========================================================================
    // Fire-and-forget commands
    // ========================================================================

    /// Authenticates the connection, then waits the settle delay.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotConnected` after [`close`](Self::close), or the
    /// transport error if the frame cannot be sent.
    pub async fn handshake(&self) -> Result<(), Error> {
        let command = HandshakeCommand::new(&self.account);
        self.send_command(&command, self.account.apikey()).await?;

        let delay = self
            .connection
            .read()
            .as_ref()
            .map_or(Duration::ZERO, |c| c.settle_delay);
        tracing::debug!(delay_ms = delay.as_millis(), "Handshake sent, settling");
        tokio::time::sleep(delay).await;
        Ok(())
    }

    /// Asks the service for the given parameters of a device.
    ///
    /// The reply is not correlated; callers interested in it can feed
    /// inbound frames to their own listener.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotConnected` after [`close`](Self::close), or the
    /// transport error if the frame cannot be sent.
    pub async fn query_status<I, S>(&self, device_id: &str, fields: I) -> Result<Envelope, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let command = QueryCommand::new(device_id, fields);
        self.send_command(&command, self.account.apikey()).await
    }

    /// Pushes parameters to a device without waiting for the acknowledgment.
    ///
    /// A fresh sequence is generated unless one is supplied.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotConnected` after [`close`](Self::close), or the
    /// transport error if the frame cannot be sent.
    pub async fn update_status(
        &self,
        device_id: &str,
        params: Value,
        sequence: Option<SequenceId>,
    ) -> Result<Envelope, Error> {
        let mut command = UpdateCommand::new(device_id, params);
        if let Some(sequence) = sequence {
            command = command.with_sequence(sequence);
        }
        self.send_command(&command, self.account.apikey()).await
    }

    // ========================================================================
    // Correlated commands
    // ========================================================================

    /// Switches a device, or one channel of it, and waits for the
    /// acknowledgment.
    ///
    /// No acknowledgment within the session timeout is not an error: the
    /// result then carries [`TIMEOUT_MESSAGE`](crate::response::TIMEOUT_MESSAGE).
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidChannel` before sending if the device has
    /// no such channel, the directory error if the lookup fails, and the
    /// transport error if the frame cannot be sent.
    pub async fn set_power_state(
        &self,
        device_id: &str,
        state: PowerState,
        options: PowerOptions,
    ) -> Result<CommandResult, Error> {
        self.ensure_connected()?;
        let device = self.directory.get_device(device_id).await?;

        let transition = new_power_state(
            specific_channel_state(&device.params, options.channel).ok(),
            state,
        );
        let params = power_state_params(&device.params, state, options.channel)?;
        tracing::debug!(
            device = %device_id,
            channel = options.channel.value(),
            from = ?transition.from,
            to = %transition.to,
            "Setting power state"
        );

        let apikey = self.credential_for(&device, options.shared);
        self.send_correlated(UpdateCommand::new(device_id, params), apikey)
            .await
    }

    /// Like [`set_power_state`](Self::set_power_state), parsing the state
    /// first.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidPowerState` before any I/O if `state` is
    /// neither `on` nor `off`; otherwise as `set_power_state`.
    pub async fn set_power_state_str(
        &self,
        device_id: &str,
        state: &str,
        options: PowerOptions,
    ) -> Result<CommandResult, Error> {
        let state: PowerState = state.parse()?;
        self.set_power_state(device_id, state, options).await
    }

    /// Pushes arbitrary parameters to a device and waits for the
    /// acknowledgment.
    ///
    /// The directory is consulted only for shared devices, to obtain the
    /// owner's key. A timeout settles the result like
    /// [`set_power_state`](Self::set_power_state).
    ///
    /// # Errors
    ///
    /// Returns the directory error for a shared device that cannot be
    /// looked up, and the transport error if the frame cannot be sent.
    pub async fn set_params(
        &self,
        device_id: &str,
        params: Value,
        options: PowerOptions,
    ) -> Result<CommandResult, Error> {
        self.ensure_connected()?;
        let apikey = if options.shared {
            let device = self.directory.get_device(device_id).await?;
            device.apikey
        } else {
            self.account.apikey().clone()
        };

        tracing::debug!(device = %device_id, shared = options.shared, "Setting device params");
        self.send_correlated(UpdateCommand::new(device_id, params), apikey)
            .await
    }

    /// Reads the power state of a device from the directory.
    ///
    /// # Errors
    ///
    /// Returns the directory error, `ValueError::InvalidChannel` for an
    /// unknown channel and `DeviceError::MissingPowerState` if the device
    /// reports no power state.
    pub async fn power_state(
        &self,
        device_id: &str,
        options: PowerOptions,
    ) -> Result<PowerStateReport, Error> {
        let device = self.directory.get_device(device_id).await?;
        power_state_report(&device.params, options.channel, options.all_channels)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Closes the connection.
    ///
    /// Requests still waiting are settled by their timers with the timeout
    /// result. Every later command fails with `Error::NotConnected`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotConnected` if already closed, or the transport
    /// error of the close handshake. Connection state is dropped either way.
    pub async fn close(&self) -> Result<(), Error> {
        let connection = self.connection.write().take().ok_or(Error::NotConnected)?;
        connection.dispatcher.abort();

        tracing::debug!(pending = self.registry.pending_count(), "Closing session");
        let result = connection.transport.close().await;
        if let Err(ref e) = result {
            tracing::warn!(error = %e, "Transport close failed");
        }
        result.map_err(Error::Protocol)
    }

    /// Returns true until [`close`](Self::close) is called.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.read().is_some()
    }

    /// Returns the number of correlated commands waiting for their
    /// acknowledgment.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.registry.pending_count()
    }

    /// Returns the account this session acts for.
    #[must_use]
    pub fn account(&self) -> &AccountCredentials {
        &self.account
    }

    /// Returns the timing configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the registry matching acknowledgments to commands.
    #[must_use]
    pub fn registry(&self) -> &CorrelationRegistry {
        &self.registry
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn transport(&self) -> Result<Arc<T>, Error> {
        self.connection
            .read()
            .as_ref()
            .map(|c| Arc::clone(&c.transport))
            .ok_or(Error::NotConnected)
    }

    fn ensure_connected(&self) -> Result<(), Error> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }

    fn credential_for(&self, device: &DeviceRecord, shared: bool) -> ApiKey {
        if shared {
            device.apikey.clone()
        } else {
            self.account.apikey().clone()
        }
    }

    async fn send_envelope(&self, envelope: &Envelope) -> Result<(), Error> {
        let transport = self.transport()?;
        let payload = envelope.to_json()?;
        tracing::debug!(
            action = ?envelope.action,
            device = envelope.deviceid.as_deref().unwrap_or_default(),
            sequence = %envelope.sequence,
            "Sending frame"
        );
        transport.send(payload).await.map_err(Error::Protocol)
    }

    async fn send_command<C: Command + Sync>(
        &self,
        command: &C,
        apikey: &ApiKey,
    ) -> Result<Envelope, Error> {
        let sequence = command.sequence().unwrap_or_else(|| self.sequences.next());
        let envelope = command.encode(apikey, sequence);
        self.send_envelope(&envelope).await?;
        Ok(envelope)
    }

    async fn send_correlated(
        &self,
        command: UpdateCommand,
        apikey: ApiKey,
    ) -> Result<CommandResult, Error> {
        let device_id = command.device_id().unwrap_or_default().to_string();
        let sequence = self.sequences.next();
        let envelope = command.encode(&apikey, sequence);

        let pending = self.registry.register(sequence, device_id)?;
        if let Err(e) = self.send_envelope(&envelope).await {
            self.registry.withdraw(sequence);
            return Err(e);
        }
        Ok(pending.await)
    }
}

fn spawn_dispatcher(
    mut inbound: broadcast::Receiver<String>,
    registry: CorrelationRegistry,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match inbound.recv().await {
                Ok(frame) => {
                    registry.dispatch(&frame);
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Inbound dispatch lagged, frames dropped");
                }
                Err(RecvError::Closed) => {
                    tracing::debug!("Inbound stream closed");
                    return;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::directory::StaticDirectory;
    use crate::protocol::{MemoryPeer, MemoryTransport};
    use crate::state::DeviceParams;

    fn session() -> (Session<MemoryTransport, StaticDirectory>, MemoryPeer) {
        let (transport, peer) = MemoryTransport::pair();
        let account = AccountCredentials::new("own-key", "token", "app-id");
        let session = Session::builder(transport, StaticDirectory::new(), account)
            .build_without_handshake();
        (session, peer)
    }

    async fn next_envelope(peer: &MemoryPeer) -> Envelope {
        let frame = peer.recv().await.unwrap();
        Envelope::from_json(&frame).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn handshake_waits_settle_delay() {
        let (session, peer) = session();
        let started = tokio::time::Instant::now();

        session.handshake().await.unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= SessionConfig::DEFAULT_HANDSHAKE_SETTLE_DELAY);
        assert!(elapsed < SessionConfig::DEFAULT_HANDSHAKE_SETTLE_DELAY + Duration::from_millis(10));
        let envelope = next_envelope(&peer).await;
        assert_eq!(envelope.action, crate::command::Action::UserOnline);
        assert_eq!(envelope.at.as_deref(), Some("token"));
    }

    #[tokio::test]
    async fn update_status_keeps_supplied_sequence() {
        let (session, peer) = session();
        let sent = session
            .update_status("dev", json!({"switch": "on"}), Some(SequenceId::new(42)))
            .await
            .unwrap();

        assert_eq!(sent.sequence, SequenceId::new(42));
        assert_eq!(next_envelope(&peer).await, sent);
        assert_eq!(session.pending_requests(), 0);
    }

    #[tokio::test]
    async fn query_sends_field_list() {
        let (session, peer) = session();
        session.query_status("dev", ["switch"]).await.unwrap();

        let envelope = next_envelope(&peer).await;
        assert_eq!(envelope.params, Some(json!(["switch"])));
        assert_eq!(envelope.apikey.as_str(), "own-key");
    }

    #[tokio::test]
    async fn failed_send_withdraws_registration() {
        let (session, peer) = session();
        session
            .directory
            .insert(DeviceRecord::new("dev", "owner", DeviceParams::single(PowerState::Off)));
        peer.fail_sends(true);

        let result = session
            .set_power_state("dev", PowerState::On, PowerOptions::new())
            .await;

        assert!(matches!(result, Err(Error::Protocol(_))));
        assert_eq!(session.pending_requests(), 0);
    }

    #[tokio::test]
    async fn closed_session_rejects_commands() {
        let (session, peer) = session();
        session.close().await.unwrap();

        assert!(peer.is_closed());
        assert!(!session.is_connected());
        assert!(matches!(session.handshake().await, Err(Error::NotConnected)));
        assert!(matches!(session.close().await, Err(Error::NotConnected)));
        assert!(matches!(
            session.set_params("dev", json!({}), PowerOptions::new()).await,
            Err(Error::NotConnected)
        ));
    }
}
