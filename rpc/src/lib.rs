// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Synchronous remote-procedure bridge over an asynchronous control channel.
//!
//! The control channel is multicast, connectionless and unreliable, and reply
//! delivery happens on a receive context unrelated to any caller.  This crate
//! turns that into a single-request-at-a-time blocking call abstraction:
//! requests are stamped with a monotonically increasing sequence identifier,
//! at most one request is in flight system-wide, and a reply is delivered to
//! a caller only if its identifier matches the request the caller issued.

#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

mod session;
mod transport;

// re-exports
pub use session::{ReplyDisposition, RpcSession, SessionParams, SessionParamsBuilder};
pub use transport::{Transport, TransportError};

use thiserror::Error;

/// The ways a [`RpcSession::call`] round trip can fail.
///
/// A timed-out round is abandoned, never retried; a transport failure is
/// surfaced immediately without consuming a timeout window.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("timed out waiting for the control daemon to respond")]
    TimedOut,
    #[error(transparent)]
    Transport(#[from] TransportError),
}
