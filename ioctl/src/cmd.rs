// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Classic bridge ioctl command numbers.

/// The subset of the classic `BRCTL_*` command numbers the shim answers.
///
/// The numeric values are part of the legacy ABI and must not change.
/// Commands outside this set (spanning-tree tuning and friends) are refused
/// as unsupported.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u64)]
pub enum BrctlCmd {
    GetBridges = 1,
    AddBridge = 2,
    DelBridge = 3,
    AddIf = 4,
    DelIf = 5,
    GetBridgeInfo = 6,
    GetPortList = 7,
    GetFdbEntries = 18,
}

impl TryFrom<u64> for BrctlCmd {
    type Error = crate::IoctlError;

    fn try_from(raw: u64) -> Result<BrctlCmd, Self::Error> {
        match raw {
            1 => Ok(BrctlCmd::GetBridges),
            2 => Ok(BrctlCmd::AddBridge),
            3 => Ok(BrctlCmd::DelBridge),
            4 => Ok(BrctlCmd::AddIf),
            5 => Ok(BrctlCmd::DelIf),
            6 => Ok(BrctlCmd::GetBridgeInfo),
            7 => Ok(BrctlCmd::GetPortList),
            18 => Ok(BrctlCmd::GetFdbEntries),
            _ => Err(crate::IoctlError::NotSupported),
        }
    }
}
