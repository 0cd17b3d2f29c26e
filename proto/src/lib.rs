// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Control-channel message model for the bridge compatibility shim.
//!
//! Requests and replies share one frame: a fixed header carrying the
//! operation code and the sequence identifier, followed by a run of typed,
//! 4-byte aligned TLV attributes.  Decoding validates every attribute against
//! the schema, so anything that parses is well-formed by construction.

#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

mod fdb;
mod name;
mod op;
mod wire;

// re-exports
pub use fdb::FdbEntry;
pub use name::{IfName, IfNameError};
pub use op::OpCode;
pub use wire::{Attr, Message, WireError};
