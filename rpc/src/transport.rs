// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Seam between the RPC session and the control channel.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Outbound half of the control channel.
///
/// Delivery is fire-and-forget multicast toward the single cooperating peer:
/// no retries, no acknowledgement.  The inbound half is push-based -- the
/// concrete transport invokes [`RpcSession::on_reply`] from its own receive
/// context rather than being polled.
///
/// [`RpcSession::on_reply`]: crate::RpcSession::on_reply
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one encoded frame toward the peer.
    async fn send(&self, frame: Bytes) -> Result<(), TransportError>;
}

/// The ways a [`Transport::send`] can fail.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No cooperating peer is reachable on the channel.
    #[error("no control daemon is reachable on the control channel")]
    NoPeer,
    /// Socket or buffer resources could not be allocated.
    #[error("transport resource exhaustion: {0}")]
    Allocation(String),
    /// Any other socket-level failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
