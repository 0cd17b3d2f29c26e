// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Host-side device attributes the adapter needs.

use proto::IfName;

/// The attributes of a network device the legacy surface touches.
///
/// The host environment (whatever embeds the shim) resolves these; the shim
/// itself never talks to the device layer beyond this struct.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceAttrs {
    pub name: IfName,
    pub ifindex: i32,
    pub mac: [u8; 6],
}

/// Resolve an interface index to its device attributes, the way the legacy
/// port add/delete path names ports.
pub trait DeviceLookup: Send + Sync {
    fn by_index(&self, ifindex: i32) -> Option<DeviceAttrs>;
}

/// Answer to the legacy bridge-info query.
///
/// This is derived locally, without a round trip: the identifier folds the
/// device MAC and spanning tree is always reported off, which is all the
/// legacy tools look at.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BridgeInfo {
    pub bridge_id: u64,
    pub stp_enabled: bool,
}

impl BridgeInfo {
    #[must_use]
    pub fn for_device(dev: &DeviceAttrs) -> BridgeInfo {
        let mut bridge_id = 0u64;
        for (i, byte) in dev.mac.iter().enumerate() {
            bridge_id |= u64::from(*byte) << (8 * (5 - i));
        }
        BridgeInfo {
            bridge_id,
            stp_enabled: false,
        }
    }
}
