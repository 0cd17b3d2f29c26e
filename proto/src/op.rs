// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Control-channel operation codes.

use std::fmt::{Display, Formatter};

/// The operation carried by a control-channel message.
///
/// Requests flow shim -> peer; [`OpCode::OperationResult`] flows back and is
/// the only reply-class operation.  [`OpCode::QueryMcGroup`] and
/// [`OpCode::SetDebugOutput`] are peer-initiated requests the shim answers
/// directly on the receive path.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    AddBridge = 1,
    DelBridge = 2,
    QueryMcGroup = 3,
    AddPort = 4,
    DelPort = 5,
    GetBridges = 6,
    GetPorts = 7,
    FdbQuery = 8,
    SetDebugOutput = 9,
    OperationResult = 10,
}

impl OpCode {
    /// Map a raw wire byte into an [`OpCode`].
    pub const fn from_wire(raw: u8) -> Option<OpCode> {
        match raw {
            1 => Some(OpCode::AddBridge),
            2 => Some(OpCode::DelBridge),
            3 => Some(OpCode::QueryMcGroup),
            4 => Some(OpCode::AddPort),
            5 => Some(OpCode::DelPort),
            6 => Some(OpCode::GetBridges),
            7 => Some(OpCode::GetPorts),
            8 => Some(OpCode::FdbQuery),
            9 => Some(OpCode::SetDebugOutput),
            10 => Some(OpCode::OperationResult),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl Display for OpCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn every_op_survives_the_wire() {
        for raw in 0..=u8::MAX {
            if let Some(op) = OpCode::from_wire(raw) {
                assert_eq!(op.as_u8(), raw);
            }
        }
        assert_eq!(OpCode::from_wire(OpCode::FdbQuery.as_u8()), Some(OpCode::FdbQuery));
        assert_eq!(OpCode::from_wire(0), None);
    }
}
