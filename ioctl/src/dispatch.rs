// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Handler registration and shim lifecycle.

use std::sync::{Arc, PoisonError, RwLock};

use tokio::task::JoinHandle;
#[allow(unused)]
use tracing::{debug, error, info, warn};

use proto::{FdbEntry, IfName};
use rpc::{RpcError, RpcSession, SessionParams};
use transport::{ChannelParams, McastChannel};

use crate::IoctlError;
use crate::adapter::BridgeAdapter;
use crate::cmd::BrctlCmd;
use crate::device::{BridgeInfo, DeviceAttrs, DeviceLookup};

/// A decoded deviceless legacy call (the classic three-word argument block).
#[derive(Debug)]
pub enum DevicelessRequest<'a> {
    GetBridges { indices: &'a mut [i32] },
    AddBridge { name: IfName },
    DelBridge { name: IfName },
}

/// A decoded per-device legacy call.
#[derive(Debug)]
pub enum DeviceRequest<'a> {
    AddIf { port_ifindex: i32 },
    DelIf { port_ifindex: i32 },
    GetBridgeInfo { info: &'a mut BridgeInfo },
    GetPortList { indices: &'a mut [i32] },
    GetFdbEntries { entries: &'a mut [FdbEntry], offset: u64 },
}

/// Argument block of a classic bridge call, as the host hands it across.
#[derive(Debug)]
pub enum CmdArgs<'a> {
    /// A bridge name (create/delete bridge).
    Name(IfName),
    /// A port interface index (add/delete interface).
    Ifindex(i32),
    /// The bridge-info result block.
    Info(&'a mut BridgeInfo),
    /// An index enumeration buffer.
    IndexBuffer(&'a mut [i32]),
    /// A forwarding-table buffer and the number of records to skip.
    Fdb { entries: &'a mut [FdbEntry], offset: u64 },
}

/// The installed legacy handler: one RPC round per call, except the locally
/// answered bridge-info query.
///
/// Successful enumerations return the count copied; everything else returns
/// zero, matching the legacy return-value convention.
pub struct BridgeIoctl {
    adapter: BridgeAdapter,
    devices: Arc<dyn DeviceLookup>,
}

impl BridgeIoctl {
    #[must_use]
    pub fn new(adapter: BridgeAdapter, devices: Arc<dyn DeviceLookup>) -> BridgeIoctl {
        BridgeIoctl { adapter, devices }
    }

    pub async fn deviceless(&self, request: DevicelessRequest<'_>) -> Result<usize, IoctlError> {
        match request {
            DevicelessRequest::GetBridges { indices } => self.adapter.get_bridges(indices).await,
            DevicelessRequest::AddBridge { name } => {
                self.adapter.add_bridge(&name).await.map(|()| 0)
            }
            DevicelessRequest::DelBridge { name } => {
                self.adapter.del_bridge(&name).await.map(|()| 0)
            }
        }
    }

    pub async fn device(
        &self,
        dev: &DeviceAttrs,
        request: DeviceRequest<'_>,
    ) -> Result<usize, IoctlError> {
        match request {
            DeviceRequest::AddIf { port_ifindex } => {
                let port = self.port_by_index(port_ifindex)?;
                self.adapter.add_port(&dev.name, &port.name).await.map(|()| 0)
            }
            DeviceRequest::DelIf { port_ifindex } => {
                let port = self.port_by_index(port_ifindex)?;
                self.adapter.del_port(&dev.name, &port.name).await.map(|()| 0)
            }
            DeviceRequest::GetBridgeInfo { info } => {
                // answered locally, no round trip
                *info = BridgeInfo::for_device(dev);
                Ok(0)
            }
            DeviceRequest::GetPortList { indices } => {
                self.adapter.get_ports(&dev.name, indices).await
            }
            DeviceRequest::GetFdbEntries { entries, offset } => {
                self.adapter.get_fdb_entries(&dev.name, entries, offset).await
            }
        }
    }

    fn port_by_index(&self, port_ifindex: i32) -> Result<DeviceAttrs, IoctlError> {
        self.devices
            .by_index(port_ifindex)
            .ok_or(IoctlError::NoSuchDevice(port_ifindex))
    }
}

/// The host's bridge-ioctl dispatch table.
///
/// The host environment owns one of these and routes every legacy bridge
/// call through it; the shim installs its handler at start and removes it at
/// shutdown.  Calls arriving while no handler is installed are refused as
/// unsupported.
#[derive(Default)]
pub struct IoctlDispatch {
    handler: RwLock<Option<Arc<BridgeIoctl>>>,
}

impl IoctlDispatch {
    #[must_use]
    pub fn new() -> IoctlDispatch {
        IoctlDispatch::default()
    }

    pub fn install(&self, handler: Arc<BridgeIoctl>) {
        *self
            .handler
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(handler);
    }

    pub fn uninstall(&self) {
        *self
            .handler
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn handler(&self) -> Result<Arc<BridgeIoctl>, IoctlError> {
        self.handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(IoctlError::NotSupported)
    }

    pub async fn deviceless(&self, request: DevicelessRequest<'_>) -> Result<usize, IoctlError> {
        self.handler()?.deviceless(request).await
    }

    pub async fn device(
        &self,
        dev: &DeviceAttrs,
        request: DeviceRequest<'_>,
    ) -> Result<usize, IoctlError> {
        self.handler()?.device(dev, request).await
    }

    /// Route a raw `BRCTL_*` command number and its argument block onto the
    /// typed surface, the way the legacy hook dispatches.  Unknown commands,
    /// and argument blocks that do not fit the command, are refused as
    /// unsupported.
    pub async fn classic(
        &self,
        raw_cmd: u64,
        dev: Option<&DeviceAttrs>,
        args: CmdArgs<'_>,
    ) -> Result<usize, IoctlError> {
        match (BrctlCmd::try_from(raw_cmd)?, dev, args) {
            (BrctlCmd::GetBridges, None, CmdArgs::IndexBuffer(indices)) => {
                self.deviceless(DevicelessRequest::GetBridges { indices }).await
            }
            (BrctlCmd::AddBridge, None, CmdArgs::Name(name)) => {
                self.deviceless(DevicelessRequest::AddBridge { name }).await
            }
            (BrctlCmd::DelBridge, None, CmdArgs::Name(name)) => {
                self.deviceless(DevicelessRequest::DelBridge { name }).await
            }
            (BrctlCmd::AddIf, Some(dev), CmdArgs::Ifindex(port_ifindex)) => {
                self.device(dev, DeviceRequest::AddIf { port_ifindex }).await
            }
            (BrctlCmd::DelIf, Some(dev), CmdArgs::Ifindex(port_ifindex)) => {
                self.device(dev, DeviceRequest::DelIf { port_ifindex }).await
            }
            (BrctlCmd::GetBridgeInfo, Some(dev), CmdArgs::Info(info)) => {
                self.device(dev, DeviceRequest::GetBridgeInfo { info }).await
            }
            (BrctlCmd::GetPortList, Some(dev), CmdArgs::IndexBuffer(indices)) => {
                self.device(dev, DeviceRequest::GetPortList { indices }).await
            }
            (BrctlCmd::GetFdbEntries, Some(dev), CmdArgs::Fdb { entries, offset }) => {
                self.device(dev, DeviceRequest::GetFdbEntries { entries, offset })
                    .await
            }
            _ => Err(IoctlError::NotSupported),
        }
    }
}

/// The assembled shim: control channel, RPC session, receive task and the
/// installed legacy handler, with an explicit lifecycle.
pub struct Shim {
    dispatch: Arc<IoctlDispatch>,
    receiver: JoinHandle<()>,
    session: Arc<RpcSession>,
}

impl Shim {
    /// Bring the shim up: join the control channel, start the receive task
    /// and install the legacy handler.
    ///
    /// A channel failure here aborts initialization; there is no degraded
    /// mode without a control channel.
    pub async fn start(
        channel_params: &ChannelParams,
        session_params: &SessionParams,
        devices: Arc<dyn DeviceLookup>,
        dispatch: Arc<IoctlDispatch>,
    ) -> Result<Shim, IoctlError> {
        let channel = Arc::new(
            McastChannel::join(channel_params)
                .await
                .map_err(RpcError::from)?,
        );
        let session = Arc::new(RpcSession::new(channel.clone(), session_params));
        let receiver = channel.spawn_receiver(session.clone());
        let handler = Arc::new(BridgeIoctl::new(
            BridgeAdapter::new(session.clone()),
            devices,
        ));
        dispatch.install(handler);
        info!("bridge compatibility shim installed");
        Ok(Shim {
            dispatch,
            receiver,
            session,
        })
    }

    /// Direct access to the RPC session, for hosts that need rounds beyond
    /// the legacy surface.
    #[must_use]
    pub fn session(&self) -> &Arc<RpcSession> {
        &self.session
    }

    /// Tear the shim down: remove the handler, then stop the receive task.
    pub fn shutdown(self) {
        self.dispatch.uninstall();
        self.receiver.abort();
        info!("bridge compatibility shim removed");
    }
}
