// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! UDP multicast control channel for the bridge compatibility shim.
//!
//! One socket, one named group: requests are multicast toward the control
//! daemon, and everything the group carries back is decoded and pushed into
//! the RPC session's inbound handler from a dedicated receive task.

#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

mod mcast;

// re-exports
pub use mcast::{ChannelParams, ChannelParamsBuilder, McastChannel};
pub use rpc::TransportError;
