// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The RPC session: sequence synchronizer, pending-reply slot and
//! single-flight gate.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use derive_builder::Builder;
use tokio::sync::oneshot;
#[allow(unused)]
use tracing::{debug, error, info, warn};

use proto::Message;

use crate::RpcError;
use crate::transport::Transport;

/// Tunables for an [`RpcSession`].  N.B. we derive a builder type
/// `SessionParamsBuilder` and provide defaults for each field.
#[derive(Builder, Clone, Debug)]
pub struct SessionParams {
    /// Bound on one round trip, send through reply consumption.
    #[builder(default = Duration::from_secs(5))]
    pub timeout: Duration,

    /// Seed for the sequence counter.  Randomized by default.  This is not a
    /// security feature; it only avoids crossed wires with a peer that
    /// outlived a previous shim instance.
    #[builder(default = rand::random::<u32>())]
    pub initial_seq: u32,
}

/// What [`RpcSession::on_reply`] did with an inbound reply-class message.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReplyDisposition {
    /// The identifier matched the current round; the waiting caller (if any)
    /// has been released.
    Accepted,
    /// The identifier belonged to a round that already timed out or was
    /// superseded; the message was discarded.
    Stale,
    /// The message did not satisfy the reply schema; neither the sequence
    /// counter nor the slot was touched.
    Malformed,
}

/// Shared state between a caller inside [`RpcSession::call`] and the
/// asynchronous receive context.  Guarded by a short-held lock which both
/// contexts may take; never held across an await point.
struct Pending {
    /// Identifier of the current round: reserved right before a request is
    /// sent, retired right after its reply is accepted.
    seq: u32,
    /// The unclaimed reply, if any.  At most one exists at a time; a reply
    /// left over from an abandoned round is discarded when the next call
    /// clears the slot.
    reply: Option<Message>,
    /// Completion signal for the round in progress.
    done: Option<oneshot::Sender<()>>,
}

/// One RPC session over a control channel.
///
/// Owns the sequence counter and the pending-reply slot, and serializes
/// callers so at most one request is outstanding system-wide: the transport
/// can only correlate one pending sequence identifier.
///
/// Create one at startup, share it (`Arc`) between the call path and the
/// transport receive path, drop it at shutdown.
pub struct RpcSession {
    transport: Arc<dyn Transport>,
    /// Single-flight gate.  Held by a caller for the whole round trip, so it
    /// must never be taken from the receive context.
    serial: tokio::sync::Mutex<()>,
    state: Mutex<Pending>,
    timeout: Duration,
}

impl RpcSession {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, params: &SessionParams) -> RpcSession {
        RpcSession {
            transport,
            serial: tokio::sync::Mutex::new(()),
            state: Mutex::new(Pending {
                seq: params.initial_seq,
                reply: None,
                done: None,
            }),
            timeout: params.timeout,
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, Pending> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Issue one request and wait for its reply.
    ///
    /// Blocks the calling task until the peer answers, the timeout elapses,
    /// or the transport reports an immediate failure.  Callers queue on the
    /// single-flight gate; that wait is intentional backpressure and is not
    /// bounded by the timeout.
    pub async fn call(&self, mut request: Message) -> Result<Message, RpcError> {
        let _flight = self.serial.lock().await;

        // Reserve the identifier first, so that replies to any earlier,
        // abandoned round are recognized as stale from here on.
        let (done_tx, done_rx) = oneshot::channel();
        let seq = {
            let mut pending = self.state();
            pending.seq = pending.seq.wrapping_add(1);
            pending.reply = None;
            pending.done = Some(done_tx);
            pending.seq
        };
        request.set_seq(seq);
        debug!("sending {} request (seq {seq})", request.op());

        self.transport.send(request.encode()).await?;

        match tokio::time::timeout(self.timeout, done_rx).await {
            Ok(Ok(())) => match self.state().reply.take() {
                Some(reply) => Ok(reply),
                None => unreachable!("completion signalled without a stored reply"),
            },
            Ok(Err(_)) => unreachable!("completion signal dropped mid-round"),
            Err(_) => {
                warn!("timed out waiting for control daemon (seq {seq})");
                Err(RpcError::TimedOut)
            }
        }
    }

    /// Inbound handler, invoked by the transport receive path for every
    /// reply-class message, possibly concurrently with an in-progress
    /// [`call`](RpcSession::call).
    ///
    /// Must never wait on the single-flight gate; it only takes the
    /// short-held state lock.
    pub fn on_reply(&self, msg: Message) -> ReplyDisposition {
        if !msg.is_reply() {
            debug!("dropping malformed reply-class message ({})", msg.op());
            return ReplyDisposition::Malformed;
        }
        let mut pending = self.state();
        if msg.seq() == pending.seq {
            // Retire this round before anything can race us to the slot.
            pending.seq = pending.seq.wrapping_add(1);
            pending.reply = Some(msg);
            if let Some(done) = pending.done.take() {
                // The caller may already have timed out and gone; the reply
                // then sits in the slot until the next call clears it.
                let _ = done.send(());
            }
            ReplyDisposition::Accepted
        } else {
            debug!(
                "discarding stale reply (seq {}, current {})",
                msg.seq(),
                pending.seq
            );
            ReplyDisposition::Stale
        }
    }
}
