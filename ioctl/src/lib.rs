// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Legacy bridge ioctl surface, answered over the control channel.
//!
//! This crate is the thin edge of the shim: it maps the classic bridge
//! management operations onto RPC rounds, enforces the caller-buffer
//! truncation and forwarding-table clamping rules, answers the bridge-info
//! query locally, and owns the install/uninstall lifecycle against the host
//! dispatch table.

#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

mod adapter;
mod cmd;
mod device;
mod dispatch;

// re-exports
pub use adapter::{BridgeAdapter, MAX_FDB_QUERY, MAX_INDEX_QUERY};
pub use cmd::BrctlCmd;
pub use device::{BridgeInfo, DeviceAttrs, DeviceLookup};
pub use dispatch::{BridgeIoctl, CmdArgs, DeviceRequest, DevicelessRequest, IoctlDispatch, Shim};

use errno::Errno;
use rpc::{RpcError, TransportError};
use thiserror::Error;

/// The ways a legacy call can fail.
///
/// Legacy callers observe a single errno-style code per failed call; see
/// [`IoctlError::as_errno`].
#[derive(Debug, Error)]
pub enum IoctlError {
    /// No handler installed, or the command is not one the shim implements.
    #[error("operation not supported")]
    NotSupported,
    /// The referenced interface index does not name a device.
    #[error("no device with interface index {0}")]
    NoSuchDevice(i32),
    /// The caller asked for an enumeration too large to be sensible.
    #[error("enumeration capacity {0} exceeds the sanity bound")]
    TooMany(usize),
    /// The round trip failed (timeout or transport).
    #[error(transparent)]
    Rpc(#[from] RpcError),
    /// The daemon answered the call with an error code.
    #[error("control daemon refused: {0}")]
    Refused(Errno),
    /// The daemon's reply did not satisfy the protocol.
    #[error("control daemon violated the reply protocol: {0}")]
    Protocol(String),
}

impl IoctlError {
    /// Collapse this failure into the single errno legacy callers expect.
    #[must_use]
    pub fn as_errno(&self) -> Errno {
        match self {
            IoctlError::NotSupported => Errno::EOPNOTSUPP,
            IoctlError::NoSuchDevice(_) => Errno::EINVAL,
            IoctlError::TooMany(_) => Errno::ENOMEM,
            IoctlError::Rpc(RpcError::TimedOut) => Errno::ETIMEDOUT,
            IoctlError::Rpc(RpcError::Transport(TransportError::NoPeer)) => Errno::ESRCH,
            IoctlError::Rpc(RpcError::Transport(TransportError::Allocation(_))) => Errno::ENOMEM,
            IoctlError::Rpc(RpcError::Transport(TransportError::Io(_))) => Errno::EIO,
            IoctlError::Refused(errno) => *errno,
            IoctlError::Protocol(_) => Errno::EINVAL,
        }
    }
}
