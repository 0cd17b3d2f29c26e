// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Mapping of legacy operations onto RPC rounds.

use std::sync::Arc;

use errno::Errno;
#[allow(unused)]
use tracing::{debug, error, info, warn};

use proto::{Attr, FdbEntry, IfName, Message, OpCode};
use rpc::RpcSession;

use crate::IoctlError;

/// Hard cap on forwarding-table queries: one memory page worth of records.
pub const MAX_FDB_QUERY: usize = 4096 / FdbEntry::WIRE_SIZE;

/// Sanity bound on index enumerations; larger caller buffers are refused
/// rather than honoured.
pub const MAX_INDEX_QUERY: usize = 2048;

/// Issues one RPC round per legacy operation and applies the reply rules:
/// error-code extraction, caller-buffer truncation, forwarding-table
/// validation.
pub struct BridgeAdapter {
    session: Arc<RpcSession>,
}

impl BridgeAdapter {
    #[must_use]
    pub fn new(session: Arc<RpcSession>) -> BridgeAdapter {
        BridgeAdapter { session }
    }

    /// One round for an operation whose reply carries nothing but the error
    /// code.
    async fn simple_call(&self, request: Message) -> Result<(), IoctlError> {
        let reply = self.session.call(request).await?;
        Self::check_err_code(&reply)
    }

    fn check_err_code(reply: &Message) -> Result<(), IoctlError> {
        let code = reply
            .err_code()
            .ok_or_else(|| IoctlError::Protocol("reply lacks an error code".to_string()))?;
        Errno::check(code).map_err(IoctlError::Refused)
    }

    pub async fn add_bridge(&self, name: &IfName) -> Result<(), IoctlError> {
        self.simple_call(
            Message::new(OpCode::AddBridge).with_attr(Attr::BridgeName(name.clone())),
        )
        .await
    }

    pub async fn del_bridge(&self, name: &IfName) -> Result<(), IoctlError> {
        self.simple_call(
            Message::new(OpCode::DelBridge).with_attr(Attr::BridgeName(name.clone())),
        )
        .await
    }

    pub async fn add_port(&self, bridge: &IfName, port: &IfName) -> Result<(), IoctlError> {
        self.simple_call(
            Message::new(OpCode::AddPort)
                .with_attr(Attr::BridgeName(bridge.clone()))
                .with_attr(Attr::PortName(port.clone())),
        )
        .await
    }

    pub async fn del_port(&self, bridge: &IfName, port: &IfName) -> Result<(), IoctlError> {
        self.simple_call(
            Message::new(OpCode::DelPort)
                .with_attr(Attr::BridgeName(bridge.clone()))
                .with_attr(Attr::PortName(port.clone())),
        )
        .await
    }

    /// Enumerate bridge indices into the caller's buffer.  Truncates to the
    /// buffer capacity and returns the count actually copied.
    pub async fn get_bridges(&self, out: &mut [i32]) -> Result<usize, IoctlError> {
        self.get_indices(Message::new(OpCode::GetBridges), out).await
    }

    /// Enumerate the port indices of one bridge into the caller's buffer.
    pub async fn get_ports(&self, bridge: &IfName, out: &mut [i32]) -> Result<usize, IoctlError> {
        self.get_indices(
            Message::new(OpCode::GetPorts).with_attr(Attr::BridgeName(bridge.clone())),
            out,
        )
        .await
    }

    async fn get_indices(&self, request: Message, out: &mut [i32]) -> Result<usize, IoctlError> {
        if out.len() >= MAX_INDEX_QUERY {
            return Err(IoctlError::TooMany(out.len()));
        }
        let reply = self.session.call(request).await?;
        Self::check_err_code(&reply)?;
        let indexes = reply
            .if_indexes()
            .ok_or_else(|| IoctlError::Protocol("reply lacks the index list".to_string()))?;
        let n = out.len().min(indexes.len());
        out[..n].copy_from_slice(&indexes[..n]);
        Ok(n)
    }

    /// Query forwarding-table records into the caller's buffer, skipping
    /// `offset` records.  The requested count is clamped to
    /// [`MAX_FDB_QUERY`] before the round is issued.
    pub async fn get_fdb_entries(
        &self,
        bridge: &IfName,
        out: &mut [FdbEntry],
        offset: u64,
    ) -> Result<usize, IoctlError> {
        let max = out.len().min(MAX_FDB_QUERY);
        let reply = self
            .session
            .call(
                Message::new(OpCode::FdbQuery)
                    .with_attr(Attr::BridgeName(bridge.clone()))
                    .with_attr(Attr::FdbCount(max as u64))
                    .with_attr(Attr::FdbSkip(offset)),
            )
            .await?;
        Self::check_err_code(&reply)?;
        let data = reply
            .fdb_data()
            .ok_or_else(|| IoctlError::Protocol("reply lacks forwarding-table data".to_string()))?;
        // the decoder already rejected lengths that are not a multiple of the
        // record size; what is left to police is the count bound
        let count = data.len() / FdbEntry::WIRE_SIZE;
        if count > max {
            return Err(IoctlError::Protocol(format!(
                "daemon reported {count} records, only {max} were requested"
            )));
        }
        for (slot, raw) in out.iter_mut().zip(data.chunks_exact(FdbEntry::WIRE_SIZE)) {
            let mut record = [0u8; FdbEntry::WIRE_SIZE];
            record.copy_from_slice(raw);
            *slot = FdbEntry::from_wire(&record);
        }
        Ok(count)
    }
}
