// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Legacy surface tests against a scripted control daemon.

use std::collections::VecDeque;
use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket as StdUdpSocket};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use pretty_assertions::assert_eq;

use brcompat_ioctl::{
    BridgeAdapter, BridgeIoctl, CmdArgs, DeviceAttrs, DeviceLookup, DeviceRequest,
    DevicelessRequest, IoctlDispatch, IoctlError, MAX_FDB_QUERY, Shim,
};
use errno::Errno;
use proto::{Attr, FdbEntry, IfName, Message, OpCode};
use rpc::{RpcError, RpcSession, SessionParamsBuilder, Transport, TransportError};
use transport::ChannelParamsBuilder;

/// Stand-in for the control daemon: answers each request from a script of
/// reply attributes and records what was asked.
#[derive(Default)]
struct ScriptedPeer {
    session: OnceLock<Arc<RpcSession>>,
    replies: Mutex<VecDeque<Vec<Attr>>>,
    requests: Mutex<Vec<Message>>,
}

impl ScriptedPeer {
    fn push_reply(&self, attrs: Vec<Attr>) {
        self.replies.lock().unwrap().push_back(attrs);
    }

    fn requests(&self) -> Vec<Message> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedPeer {
    async fn send(&self, frame: Bytes) -> Result<(), TransportError> {
        let request = Message::decode(&frame).expect("requests must encode cleanly");
        let seq = request.seq();
        self.requests.lock().unwrap().push(request);

        let attrs = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("request arrived with no scripted reply");
        let mut reply = Message::new(OpCode::OperationResult);
        for attr in attrs {
            reply = reply.with_attr(attr);
        }
        reply.set_seq(seq);
        self.session.get().expect("session wired up").on_reply(reply);
        Ok(())
    }
}

fn harness() -> (Arc<ScriptedPeer>, BridgeAdapter) {
    let peer = Arc::new(ScriptedPeer::default());
    let session = Arc::new(RpcSession::new(
        peer.clone(),
        &SessionParamsBuilder::default()
            .timeout(Duration::from_millis(100))
            .initial_seq(500)
            .build()
            .unwrap(),
    ));
    assert!(peer.session.set(session.clone()).is_ok());
    (peer, BridgeAdapter::new(session))
}

fn name(s: &str) -> IfName {
    IfName::try_from(s).unwrap()
}

fn fdb_bytes(entries: &[FdbEntry]) -> Bytes {
    let mut out = Vec::with_capacity(entries.len() * FdbEntry::WIRE_SIZE);
    for entry in entries {
        out.extend_from_slice(&entry.to_wire());
    }
    Bytes::from(out)
}

struct StaticDevices(Vec<DeviceAttrs>);

impl DeviceLookup for StaticDevices {
    fn by_index(&self, ifindex: i32) -> Option<DeviceAttrs> {
        self.0.iter().find(|dev| dev.ifindex == ifindex).cloned()
    }
}

fn bridge_dev() -> DeviceAttrs {
    DeviceAttrs {
        name: name("br0"),
        ifindex: 4,
        mac: [0x02, 0x11, 0x22, 0x33, 0x44, 0x55],
    }
}

#[tokio::test]
async fn add_bridge_issues_one_round_and_succeeds() {
    let (peer, adapter) = harness();
    peer.push_reply(vec![Attr::ErrCode(0)]);

    adapter.add_bridge(&name("br0")).await.unwrap();

    let requests = peer.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].op(), OpCode::AddBridge);
    assert_eq!(requests[0].seq(), 501);
    assert_eq!(requests[0].bridge_name().unwrap().as_str(), "br0");
}

#[tokio::test]
async fn peer_refusal_surfaces_the_reported_errno() {
    let (peer, adapter) = harness();
    peer.push_reply(vec![Attr::ErrCode(16)]); // EBUSY

    let err = adapter.del_bridge(&name("br0")).await.unwrap_err();
    assert!(matches!(err, IoctlError::Refused(code) if code == Errno::EBUSY));
    assert_eq!(err.as_errno(), Errno::EBUSY);
}

#[tokio::test]
async fn port_list_truncates_to_the_caller_buffer() {
    let (peer, adapter) = harness();
    peer.push_reply(vec![
        Attr::ErrCode(0),
        Attr::IfIndexes((1..=10).collect()),
    ]);

    let mut out = [0i32; 4];
    let copied = adapter.get_ports(&name("br0"), &mut out).await.unwrap();
    assert_eq!(copied, 4);
    assert_eq!(out, [1, 2, 3, 4]);

    let requests = peer.requests();
    assert_eq!(requests[0].op(), OpCode::GetPorts);
    assert_eq!(requests[0].bridge_name().unwrap().as_str(), "br0");
}

#[tokio::test]
async fn oversized_enumeration_is_refused_before_any_round() {
    let (peer, adapter) = harness();

    let mut out = vec![0i32; 2048];
    let err = adapter.get_bridges(&mut out).await.unwrap_err();
    assert!(matches!(err, IoctlError::TooMany(2048)));
    assert_eq!(err.as_errno(), Errno::ENOMEM);
    assert!(peer.requests().is_empty());
}

#[tokio::test]
async fn reply_lacking_the_index_list_is_a_protocol_violation() {
    let (peer, adapter) = harness();
    peer.push_reply(vec![Attr::ErrCode(0)]);

    let mut out = [0i32; 8];
    let err = adapter.get_bridges(&mut out).await.unwrap_err();
    assert!(matches!(err, IoctlError::Protocol(_)));
    assert_eq!(err.as_errno(), Errno::EINVAL);
}

#[tokio::test]
async fn fdb_request_is_clamped_to_one_page() {
    let (peer, adapter) = harness();
    let entries = [
        FdbEntry {
            mac_addr: [0xde, 0xad, 0xbe, 0xef, 0x00, 0x01],
            port_no: 1,
            is_local: false,
            ageing_timer_value: 30,
            port_hi: 0,
        },
        FdbEntry {
            mac_addr: [0x02, 0x11, 0x22, 0x33, 0x44, 0x55],
            port_no: 2,
            is_local: true,
            ageing_timer_value: 0,
            port_hi: 0,
        },
    ];
    peer.push_reply(vec![Attr::ErrCode(0), Attr::FdbData(fdb_bytes(&entries))]);

    let mut out = vec![FdbEntry::default(); 300];
    let count = adapter
        .get_fdb_entries(&name("br0"), &mut out, 5)
        .await
        .unwrap();
    assert_eq!(count, 2);
    assert_eq!(out[..2], entries);

    let requests = peer.requests();
    assert_eq!(requests[0].op(), OpCode::FdbQuery);
    assert_eq!(requests[0].fdb_count(), Some(MAX_FDB_QUERY as u64));
    assert_eq!(requests[0].fdb_skip(), Some(5));
}

#[tokio::test]
async fn overcounted_fdb_reply_is_a_protocol_violation() {
    let (peer, adapter) = harness();
    peer.push_reply(vec![
        Attr::ErrCode(0),
        Attr::FdbData(fdb_bytes(&[FdbEntry::default(); 2])),
    ]);

    let mut out = [FdbEntry::default(); 1];
    let err = adapter
        .get_fdb_entries(&name("br0"), &mut out, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, IoctlError::Protocol(_)));
}

#[tokio::test]
async fn port_add_resolves_the_interface_index() {
    let (peer, adapter) = harness();
    peer.push_reply(vec![Attr::ErrCode(0)]);
    let handler = BridgeIoctl::new(
        adapter,
        Arc::new(StaticDevices(vec![DeviceAttrs {
            name: name("eth0"),
            ifindex: 9,
            mac: [0; 6],
        }])),
    );

    handler
        .device(&bridge_dev(), DeviceRequest::AddIf { port_ifindex: 9 })
        .await
        .unwrap();
    let requests = peer.requests();
    assert_eq!(requests[0].op(), OpCode::AddPort);
    assert_eq!(requests[0].bridge_name().unwrap().as_str(), "br0");
    assert_eq!(requests[0].port_name().unwrap().as_str(), "eth0");

    // an unknown index never reaches the channel
    let err = handler
        .device(&bridge_dev(), DeviceRequest::DelIf { port_ifindex: 33 })
        .await
        .unwrap_err();
    assert!(matches!(err, IoctlError::NoSuchDevice(33)));
    assert_eq!(err.as_errno(), Errno::EINVAL);
    assert_eq!(peer.requests().len(), 1);
}

#[tokio::test]
async fn bridge_info_is_answered_without_a_round_trip() {
    let (peer, adapter) = harness();
    let handler = BridgeIoctl::new(adapter, Arc::new(StaticDevices(vec![])));

    let mut info = brcompat_ioctl::BridgeInfo::default();
    handler
        .device(&bridge_dev(), DeviceRequest::GetBridgeInfo { info: &mut info })
        .await
        .unwrap();
    assert_eq!(info.bridge_id, 0x0000_0211_2233_4455);
    assert!(!info.stp_enabled);
    assert!(peer.requests().is_empty());
}

#[tokio::test]
async fn classic_command_numbers_route_to_the_typed_surface() {
    let (peer, adapter) = harness();
    peer.push_reply(vec![Attr::ErrCode(0)]);
    peer.push_reply(vec![Attr::ErrCode(0), Attr::IfIndexes(vec![4])]);
    let dispatch = IoctlDispatch::new();
    dispatch.install(Arc::new(BridgeIoctl::new(
        adapter,
        Arc::new(StaticDevices(vec![])),
    )));

    // BRCTL_ADD_BRIDGE
    dispatch
        .classic(2, None, CmdArgs::Name(name("br0")))
        .await
        .unwrap();
    // BRCTL_GET_PORT_LIST
    let mut out = [0i32; 4];
    let copied = dispatch
        .classic(7, Some(&bridge_dev()), CmdArgs::IndexBuffer(&mut out))
        .await
        .unwrap();
    assert_eq!(copied, 1);
    assert_eq!(out[0], 4);

    let requests = peer.requests();
    assert_eq!(requests[0].op(), OpCode::AddBridge);
    assert_eq!(requests[1].op(), OpCode::GetPorts);
}

#[tokio::test]
async fn unfit_classic_commands_are_refused_without_a_round() {
    let (peer, adapter) = harness();
    let dispatch = IoctlDispatch::new();
    dispatch.install(Arc::new(BridgeIoctl::new(
        adapter,
        Arc::new(StaticDevices(vec![])),
    )));

    // spanning-tree tuning command, outside the answered set
    let err = dispatch
        .classic(8, None, CmdArgs::Ifindex(1))
        .await
        .unwrap_err();
    assert!(matches!(err, IoctlError::NotSupported));

    // a name block handed to an enumeration command does not fit
    let err = dispatch
        .classic(1, None, CmdArgs::Name(name("br0")))
        .await
        .unwrap_err();
    assert!(matches!(err, IoctlError::NotSupported));
    assert!(peer.requests().is_empty());
}

#[tokio::test]
async fn uninstalled_dispatch_refuses_calls() {
    let dispatch = IoctlDispatch::new();
    let mut out = [0i32; 4];
    let err = dispatch
        .deviceless(DevicelessRequest::GetBridges { indices: &mut out })
        .await
        .unwrap_err();
    assert!(matches!(err, IoctlError::NotSupported));
    assert_eq!(err.as_errno(), Errno::EOPNOTSUPP);
}

#[tokio::test]
async fn shim_lifecycle_installs_and_removes_the_handler() {
    // loopback unicast stand-in for the group, on a port the OS picks
    let probe = StdUdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let port = probe.local_addr().unwrap().port();
    drop(probe);
    let channel_params = ChannelParamsBuilder::default()
        .group_name("brcompat-test")
        .group_addr(SocketAddrV4::new(Ipv4Addr::LOCALHOST, port))
        .build()
        .unwrap();
    let session_params = SessionParamsBuilder::default()
        .timeout(Duration::from_millis(50))
        .initial_seq(1)
        .build()
        .unwrap();

    let dispatch = Arc::new(IoctlDispatch::new());
    let shim = Shim::start(
        &channel_params,
        &session_params,
        Arc::new(StaticDevices(vec![])),
        dispatch.clone(),
    )
    .await
    .unwrap();

    // the call crosses the real channel; nobody answers, so it times out,
    // which proves the handler is wired through to the socket
    let err = dispatch
        .deviceless(DevicelessRequest::AddBridge { name: name("br0") })
        .await
        .unwrap_err();
    assert!(matches!(err, IoctlError::Rpc(RpcError::TimedOut)));
    assert_eq!(err.as_errno(), Errno::ETIMEDOUT);

    shim.shutdown();
    let err = dispatch
        .deviceless(DevicelessRequest::DelBridge { name: name("br0") })
        .await
        .unwrap_err();
    assert!(matches!(err, IoctlError::NotSupported));
}
