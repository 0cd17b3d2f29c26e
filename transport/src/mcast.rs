// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The multicast channel proper.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket as StdUdpSocket};
use std::os::fd::{AsRawFd, OwnedFd};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use derive_builder::Builder;
use nix::sys::socket::{
    AddressFamily, SockFlag, SockType, SockaddrIn, bind, setsockopt, socket, sockopt,
};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

use proto::{Attr, Message, OpCode};
use rpc::{ReplyDisposition, RpcSession, Transport, TransportError};

/// Largest frame the channel will accept, request or reply.  One page of
/// forwarding-table data (the bound the queries are clamped to) plus room
/// for the frame header and attribute headers around it.
pub const MAX_FRAME: usize = 4096 + 128;

/// Where the control channel lives.  N.B. we derive a builder type
/// `ChannelParamsBuilder` and provide defaults for each field.
///
/// The group address is normally multicast; a unicast address is accepted
/// too (the group degenerates to point-to-point), which is what the test
/// suite uses to run the whole channel over loopback.
#[derive(Builder, Clone, Debug)]
pub struct ChannelParams {
    /// Human-readable group name, used in logs only.
    #[builder(setter(into), default = "brcompat".to_string())]
    pub group_name: String,

    /// Group identifier handed to peers that ask via `QueryMcGroup`.
    #[builder(default = 1)]
    pub group_id: u32,

    /// Destination of outgoing requests; also the port this end binds.
    #[builder(default = SocketAddrV4::new(Ipv4Addr::new(239, 77, 12, 1), 7712))]
    pub group_addr: SocketAddrV4,

    /// Local interface for the multicast membership.
    #[builder(default = Ipv4Addr::UNSPECIFIED)]
    pub interface: Ipv4Addr,
}

/// The control channel: outbound half of the RPC transport plus the receive
/// task feeding the session.
///
/// Failure to bind or join here aborts shim initialization; there is no
/// degraded mode without a control channel.
pub struct McastChannel {
    socket: Arc<UdpSocket>,
    group_addr: SocketAddrV4,
    group_id: u32,
    group_name: String,
}

impl McastChannel {
    /// Bind the group port and join the group.
    pub async fn join(params: &ChannelParams) -> Result<McastChannel, TransportError> {
        let socket = Arc::new(Self::bind_reuse(params.group_addr.port())?);
        if params.group_addr.ip().is_multicast() {
            socket.join_multicast_v4(*params.group_addr.ip(), params.interface)?;
            // the daemon may live on this same host
            socket.set_multicast_loop_v4(true)?;
        }
        info!(
            "control channel '{}' (id {}) joined on {}",
            params.group_name, params.group_id, params.group_addr
        );
        Ok(McastChannel {
            socket,
            group_addr: params.group_addr,
            group_id: params.group_id,
            group_name: params.group_name.clone(),
        })
    }

    /// A non-blocking UDP socket bound to the group port with `SO_REUSEADDR`,
    /// so the shim and a same-host daemon can share the group binding.
    fn bind_reuse(port: u16) -> Result<UdpSocket, TransportError> {
        let fd: OwnedFd = socket(
            AddressFamily::Inet,
            SockType::Datagram,
            SockFlag::SOCK_NONBLOCK | SockFlag::SOCK_CLOEXEC,
            None,
        )
        .map_err(|errno| TransportError::Allocation(errno.to_string()))?;
        setsockopt(&fd, sockopt::ReuseAddr, &true)
            .map_err(|errno| TransportError::Allocation(errno.to_string()))?;
        bind(
            fd.as_raw_fd(),
            &SockaddrIn::from(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port)),
        )
        .map_err(|errno| TransportError::Allocation(errno.to_string()))?;
        Ok(UdpSocket::from_std(StdUdpSocket::from(fd))?)
    }

    #[must_use]
    pub fn group_id(&self) -> u32 {
        self.group_id
    }

    /// Spawn the receive task: decode every inbound frame, push reply-class
    /// messages into the session, answer peer-initiated requests, drop the
    /// rest (including loopback copies of our own requests).
    ///
    /// The task runs until aborted; the shim keeps the handle and aborts it
    /// at shutdown.
    #[must_use]
    pub fn spawn_receiver(&self, session: Arc<RpcSession>) -> JoinHandle<()> {
        let socket = self.socket.clone();
        let group_id = self.group_id;
        let group_name = self.group_name.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_FRAME];
            loop {
                let (len, from) = match socket.recv_from(&mut buf).await {
                    Ok(received) => received,
                    Err(e) => {
                        warn!("control channel '{group_name}' receive failure: {e}");
                        continue;
                    }
                };
                let msg = match Message::decode(&buf[..len]) {
                    Ok(msg) => msg,
                    Err(e) => {
                        debug!("dropping undecodable frame from {from}: {e}");
                        continue;
                    }
                };
                Self::dispatch(&session, &socket, group_id, msg, from).await;
            }
        })
    }

    async fn dispatch(
        session: &RpcSession,
        socket: &UdpSocket,
        group_id: u32,
        msg: Message,
        from: SocketAddr,
    ) {
        match msg.op() {
            OpCode::OperationResult => match session.on_reply(msg) {
                ReplyDisposition::Accepted => trace!("reply accepted"),
                ReplyDisposition::Stale => debug!("stale reply from {from} discarded"),
                ReplyDisposition::Malformed => debug!("malformed reply from {from} rejected"),
            },
            OpCode::QueryMcGroup => {
                // Unicast answer straight back to whoever asked.
                let mut answer =
                    Message::new(OpCode::QueryMcGroup).with_attr(Attr::McGroupId(group_id));
                answer.set_seq(msg.seq());
                if let Err(e) = socket.send_to(&answer.encode(), from).await {
                    warn!("failed to answer group query from {from}: {e}");
                }
            }
            OpCode::SetDebugOutput => {
                // Validated by the decoder; the filesystem surface behind
                // this operation is not provided here.
                debug!("ignoring debug-output update from {from}");
            }
            op => {
                // Requests we multicast come back to us; the daemon answers
                // them, we don't.
                trace!("ignoring {op} request seen on the group");
            }
        }
    }
}

#[async_trait]
impl Transport for McastChannel {
    async fn send(&self, frame: Bytes) -> Result<(), TransportError> {
        let sent = self
            .socket
            .send_to(&frame, self.group_addr)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::ConnectionRefused => TransportError::NoPeer,
                std::io::ErrorKind::OutOfMemory => TransportError::Allocation(e.to_string()),
                _ => TransportError::Io(e),
            })?;
        if sent != frame.len() {
            return Err(TransportError::Allocation(format!(
                "short send: {sent} of {} bytes",
                frame.len()
            )));
        }
        Ok(())
    }
}
