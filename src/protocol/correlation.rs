// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Matching acknowledgments to in-flight commands.
//!
//! Every correlated command registers its sequence id before it is sent.
//! Inbound frames are then fed to [`CorrelationRegistry::dispatch`] in
//! arrival order, and each frame whose `deviceid` and `sequence` match a
//! registration settles it.
//!
//! # Architecture
//!
//! ```text
//! register(seq, device) ──► pending[seq] = { device, completion, timer }
//!                                   │
//!          ┌────────────────────────┴────────────────────────┐
//!          ▼                                                 ▼
//!   dispatch(frame)                                   timer fires
//!   pending.remove(seq)                               pending.remove(seq)
//!   timer.abort()                                     send(timed out)
//!   send(ack result)
//! ```
//!
//! Removal from the map under the lock is the only arbitration point:
//! whichever path removes the entry settles it, and the other path finds
//! nothing. Each registration therefore settles exactly once and leaves no
//! entry or timer behind.
//!
//! Aborting a timer that already woke up does not stop it, so a timer only
//! removes the entry carrying its own registration generation. A sequence
//! registered again after settlement is never expired by the old timer.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::ProtocolError;
use crate::response::{ABANDONED_MESSAGE, CommandResult, InboundMessage};
use crate::types::SequenceId;

/// Registry of commands waiting for their acknowledgment.
///
/// Cheaply cloneable; clones share the same registrations.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use ewelink_session::protocol::CorrelationRegistry;
/// use ewelink_session::types::SequenceId;
///
/// # #[tokio::main]
/// # async fn main() -> ewelink_session::Result<()> {
/// let registry = CorrelationRegistry::new(Duration::from_secs(5));
/// let pending = registry.register(SequenceId::new(1), "1000abcdef")?;
///
/// registry.dispatch(r#"{"error":0,"deviceid":"1000abcdef","sequence":"1"}"#);
///
/// assert!(pending.await.is_ok());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CorrelationRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Debug)]
struct RegistryInner {
    pending: Mutex<HashMap<SequenceId, PendingRequest>>,
    generations: AtomicU64,
    default_timeout: Duration,
}

#[derive(Debug)]
struct PendingRequest {
    device_id: String,
    generation: u64,
    completion: oneshot::Sender<CommandResult>,
    timer: JoinHandle<()>,
}

impl CorrelationRegistry {
    /// Default time to wait for an acknowledgment.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Creates an empty registry.
    #[must_use]
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                pending: Mutex::new(HashMap::new()),
                generations: AtomicU64::new(0),
                default_timeout,
            }),
        }
    }

    /// Returns the timeout used by [`register`](Self::register).
    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        self.inner.default_timeout
    }

    /// Registers a command with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::DuplicateSequence` if `sequence` is already
    /// waiting.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn register(
        &self,
        sequence: SequenceId,
        device_id: impl Into<String>,
    ) -> Result<PendingResponse, ProtocolError> {
        self.register_with_timeout(sequence, device_id, self.inner.default_timeout)
    }

    /// Registers a command and arms its timer.
    ///
    /// The returned future settles exactly once: with the acknowledgment's
    /// result, or with [`CommandResult::timed_out`] after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::DuplicateSequence` if `sequence` is already
    /// waiting.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn register_with_timeout(
        &self,
        sequence: SequenceId,
        device_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<PendingResponse, ProtocolError> {
        let device_id = device_id.into();
        let (completion, rx) = oneshot::channel();

        let mut pending = self.inner.pending.lock();
        if pending.contains_key(&sequence) {
            return Err(ProtocolError::DuplicateSequence(sequence));
        }

        let generation = self.inner.generations.fetch_add(1, Ordering::Relaxed);
        let timer = tokio::spawn(expire(
            Arc::downgrade(&self.inner),
            sequence,
            generation,
            timeout,
        ));

        tracing::debug!(
            sequence = %sequence,
            device = %device_id,
            timeout_ms = timeout.as_millis(),
            "Registered correlated request"
        );
        pending.insert(
            sequence,
            PendingRequest {
                device_id,
                generation,
                completion,
                timer,
            },
        );

        Ok(PendingResponse { sequence, rx })
    }

    /// Feeds one raw inbound frame to the registry.
    ///
    /// Frames that are not JSON objects, that carry no correlation key, or
    /// that match no registration are ignored: the connection also carries
    /// unrelated traffic.
    ///
    /// Returns `true` if the frame settled a registration.
    pub fn dispatch(&self, raw: &str) -> bool {
        match InboundMessage::parse(raw) {
            Ok(message) => self.resolve(&message),
            Err(e) => {
                tracing::trace!(error = %e, "Discarding unparseable inbound frame");
                false
            }
        }
    }

    /// Settles the registration matching an already parsed message.
    ///
    /// Returns `true` if the message settled a registration.
    pub fn resolve(&self, message: &InboundMessage) -> bool {
        let Some((device_id, sequence)) = message.correlation_key() else {
            return false;
        };

        let request = {
            let mut pending = self.inner.pending.lock();
            if pending
                .get(&sequence)
                .is_some_and(|request| request.device_id == device_id)
            {
                pending.remove(&sequence)
            } else {
                None
            }
        };

        let Some(request) = request else {
            tracing::trace!(
                sequence = %sequence,
                device = %device_id,
                "No pending request for inbound frame"
            );
            return false;
        };

        request.timer.abort();
        let result = message.to_result();
        tracing::debug!(
            sequence = %sequence,
            device = %device_id,
            status = ?result.status,
            "Resolved correlated request"
        );
        // The waiter may have been dropped; the registration is gone either way.
        let _ = request.completion.send(result);
        true
    }

    /// Drops a registration whose command never reached the connection.
    ///
    /// Its waiter settles with the abandoned result.
    pub(crate) fn withdraw(&self, sequence: SequenceId) -> bool {
        let Some(request) = self.inner.pending.lock().remove(&sequence) else {
            return false;
        };
        request.timer.abort();
        tracing::debug!(sequence = %sequence, "Withdrew correlated request");
        true
    }

    /// Returns true if `sequence` is waiting for its acknowledgment.
    #[must_use]
    pub fn is_pending(&self, sequence: SequenceId) -> bool {
        self.inner.pending.lock().contains_key(&sequence)
    }

    /// Returns the number of registrations still waiting.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending.lock().len()
    }
}

impl Default for CorrelationRegistry {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIMEOUT)
    }
}

impl Drop for RegistryInner {
    fn drop(&mut self) {
        for (_, request) in self.pending.get_mut().drain() {
            request.timer.abort();
        }
    }
}

/// Timer body: settles the registration with the timeout result unless an
/// acknowledgment got there first.
async fn expire(
    registry: Weak<RegistryInner>,
    sequence: SequenceId,
    generation: u64,
    timeout: Duration,
) {
    tokio::time::sleep(timeout).await;

    let Some(registry) = registry.upgrade() else {
        return;
    };
    let request = {
        let mut pending = registry.pending.lock();
        if pending
            .get(&sequence)
            .is_some_and(|request| request.generation == generation)
        {
            pending.remove(&sequence)
        } else {
            None
        }
    };
    let Some(request) = request else {
        return;
    };

    tracing::debug!(
        sequence = %sequence,
        device = %request.device_id,
        timeout_ms = timeout.as_millis(),
        "Correlated request timed out"
    );
    let _ = request.completion.send(CommandResult::timed_out(timeout));
}

/// Future settling with the result of a registered command.
#[derive(Debug)]
#[must_use = "dropping the response discards the command result"]
pub struct PendingResponse {
    sequence: SequenceId,
    rx: oneshot::Receiver<CommandResult>,
}

impl PendingResponse {
    /// Returns the sequence this response is waiting on.
    pub fn sequence(&self) -> SequenceId {
        self.sequence
    }
}

impl Future for PendingResponse {
    type Output = CommandResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or_else(|_| CommandResult::error(ABANDONED_MESSAGE)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{CommandStatus, TIMEOUT_MESSAGE};

    fn ack(device: &str, sequence: u64, error: i64, reason: &str) -> String {
        serde_json::json!({
            "error": error,
            "deviceid": device,
            "apikey": "key",
            "sequence": sequence.to_string(),
            "reason": reason,
        })
        .to_string()
    }

    #[tokio::test]
    async fn matching_ack_resolves_ok() {
        let registry = CorrelationRegistry::default();
        let pending = registry.register(SequenceId::new(1), "dev").unwrap();

        assert!(registry.dispatch(&ack("dev", 1, 0, "ok")));

        let result = pending.await;
        assert_eq!(result.status, CommandStatus::Ok);
        assert_eq!(result.message.as_deref(), Some("ok"));
        assert_eq!(registry.pending_count(), 0);
    }

    #[tokio::test]
    async fn nonzero_error_resolves_with_reason() {
        let registry = CorrelationRegistry::default();
        let pending = registry.register(SequenceId::new(2), "dev").unwrap();

        registry.dispatch(&ack("dev", 2, 504, "device offline"));

        let result = pending.await;
        assert_eq!(result.status, CommandStatus::Error);
        assert_eq!(result.message.as_deref(), Some("device offline"));
        assert!(!result.is_timeout());
    }

    #[tokio::test]
    async fn second_matching_ack_is_ignored() {
        let registry = CorrelationRegistry::default();
        let pending = registry.register(SequenceId::new(3), "dev").unwrap();

        assert!(registry.dispatch(&ack("dev", 3, 0, "first")));
        assert!(!registry.dispatch(&ack("dev", 3, 1, "second")));

        assert_eq!(pending.await.message.as_deref(), Some("first"));
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_request_times_out() {
        let registry = CorrelationRegistry::default();
        let pending = registry
            .register_with_timeout(SequenceId::new(4), "dev", Duration::from_millis(250))
            .unwrap();

        let result = pending.await;
        assert_eq!(result.status, CommandStatus::Error);
        assert_eq!(result.message.as_deref(), Some(TIMEOUT_MESSAGE));
        assert!(result.is_timeout());
        assert!(!registry.is_pending(SequenceId::new(4)));

        // A late acknowledgment finds nothing to settle.
        assert!(!registry.dispatch(&ack("dev", 4, 0, "late")));
    }

    #[tokio::test(start_paused = true)]
    async fn default_timeout_is_five_seconds() {
        let registry = CorrelationRegistry::default();
        let started = tokio::time::Instant::now();
        let result = registry.register(SequenceId::new(5), "dev").unwrap().await;

        let elapsed = started.elapsed();
        assert!(result.is_timeout());
        assert!(elapsed >= Duration::from_secs(5));
        assert!(elapsed < Duration::from_millis(5010));
    }

    #[tokio::test(start_paused = true)]
    async fn ack_cancels_timer() {
        let registry = CorrelationRegistry::default();
        let pending = registry.register(SequenceId::new(6), "dev").unwrap();
        registry.dispatch(&ack("dev", 6, 0, "ok"));

        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(pending.await.is_ok());
        assert_eq!(registry.pending_count(), 0);
    }

    #[tokio::test]
    async fn unknown_sequence_is_noop() {
        let registry = CorrelationRegistry::default();
        let _pending = registry.register(SequenceId::new(7), "dev").unwrap();

        assert!(!registry.dispatch(&ack("dev", 999, 0, "ok")));
        assert!(registry.is_pending(SequenceId::new(7)));
    }

    #[tokio::test]
    async fn device_mismatch_is_noop() {
        let registry = CorrelationRegistry::default();
        let _pending = registry.register(SequenceId::new(8), "dev").unwrap();

        assert!(!registry.dispatch(&ack("other", 8, 0, "ok")));
        assert!(registry.is_pending(SequenceId::new(8)));
    }

    #[tokio::test]
    async fn malformed_frames_are_dropped() {
        let registry = CorrelationRegistry::default();
        let _pending = registry.register(SequenceId::new(9), "dev").unwrap();

        for frame in ["pong", "{not json", "[]", r#"{"sequence":"abc","deviceid":"dev"}"#] {
            assert!(!registry.dispatch(frame));
        }
        assert_eq!(registry.pending_count(), 1);
    }

    #[tokio::test]
    async fn out_of_order_acks_resolve_independently() {
        let registry = CorrelationRegistry::default();
        let a = registry.register(SequenceId::new(10), "dev-a").unwrap();
        let b = registry.register(SequenceId::new(11), "dev-b").unwrap();

        assert!(registry.dispatch(&ack("dev-b", 11, 0, "b")));
        assert!(registry.dispatch(&ack("dev-a", 10, 0, "a")));

        assert_eq!(b.await.message.as_deref(), Some("b"));
        assert_eq!(a.await.message.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn duplicate_sequence_rejected() {
        let registry = CorrelationRegistry::default();
        let _first = registry.register(SequenceId::new(12), "dev").unwrap();

        assert!(matches!(
            registry.register(SequenceId::new(12), "dev"),
            Err(ProtocolError::DuplicateSequence(seq)) if seq == SequenceId::new(12)
        ));
    }

    #[tokio::test]
    async fn sequence_reusable_after_settlement() {
        let registry = CorrelationRegistry::default();
        let first = registry.register(SequenceId::new(13), "dev").unwrap();
        registry.dispatch(&ack("dev", 13, 0, "ok"));
        first.await;

        assert!(registry.register(SequenceId::new(13), "dev").is_ok());
    }

    #[tokio::test]
    async fn stale_timer_leaves_reused_sequence_alone() {
        let registry = CorrelationRegistry::default();
        let first = registry.register(SequenceId::new(16), "dev").unwrap();
        registry.dispatch(&ack("dev", 16, 0, "first"));
        first.await;

        let second = registry.register(SequenceId::new(16), "dev").unwrap();

        // Timer of the first registration (generation 0) waking up late.
        expire(
            Arc::downgrade(&registry.inner),
            SequenceId::new(16),
            0,
            Duration::ZERO,
        )
        .await;
        assert!(registry.is_pending(SequenceId::new(16)));

        registry.dispatch(&ack("dev", 16, 0, "second"));
        assert_eq!(second.await.message.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn withdrawn_request_is_abandoned() {
        let registry = CorrelationRegistry::default();
        let pending = registry.register(SequenceId::new(14), "dev").unwrap();

        assert!(registry.withdraw(SequenceId::new(14)));
        assert!(!registry.withdraw(SequenceId::new(14)));

        let result = pending.await;
        assert_eq!(result.message.as_deref(), Some(ABANDONED_MESSAGE));
    }

    #[tokio::test]
    async fn dropping_registry_abandons_waiters() {
        let registry = CorrelationRegistry::default();
        let pending = registry.register(SequenceId::new(15), "dev").unwrap();
        drop(registry);

        assert_eq!(pending.await.message.as_deref(), Some(ABANDONED_MESSAGE));
    }
}
