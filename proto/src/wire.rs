// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Frame and attribute codec.
//!
//! A frame is an 8-byte header (version, operation, flags, reserved, 32-bit
//! sequence) followed by typed TLV attributes.  Attribute payloads are padded
//! to 4-byte alignment.  Decoding is strict: unknown operations, unknown
//! attribute kinds and ill-sized payloads are all rejected, so a [`Message`]
//! in hand always satisfies the attribute schema.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::fdb::FdbEntry;
use crate::name::{IfName, IfNameError};
use crate::op::OpCode;

/// Wire protocol version this crate speaks.
pub const WIRE_VERSION: u8 = 1;

const HEADER_SIZE: usize = 8;
const ATTR_HEADER_SIZE: usize = 4;

const fn pad_for(len: usize) -> usize {
    (4 - len % 4) % 4
}

/// A typed control-channel attribute.
///
/// The variants mirror the attribute schema: holding one is proof the payload
/// bounds were validated on ingress.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Attr {
    /// Operation result code; `0` is success.
    ErrCode(u32),
    BridgeName(IfName),
    PortName(IfName),
    /// Maximum number of forwarding-table records requested.
    FdbCount(u64),
    /// Number of forwarding-table records to skip.
    FdbSkip(u64),
    /// Packed forwarding-table records; length is a multiple of
    /// [`FdbEntry::WIRE_SIZE`].
    FdbData(Bytes),
    /// Interface indices; wire length is a multiple of 4.
    IfIndexes(Vec<i32>),
    DebugDir(String),
    DebugName(String),
    DebugData(String),
    McGroupId(u32),
}

impl Attr {
    const fn kind(&self) -> u16 {
        match self {
            Attr::ErrCode(_) => 1,
            Attr::BridgeName(_) => 2,
            Attr::PortName(_) => 3,
            Attr::FdbCount(_) => 4,
            Attr::FdbSkip(_) => 5,
            Attr::FdbData(_) => 6,
            Attr::IfIndexes(_) => 7,
            Attr::DebugDir(_) => 8,
            Attr::DebugName(_) => 9,
            Attr::DebugData(_) => 10,
            Attr::McGroupId(_) => 11,
        }
    }

    fn payload(&self) -> Vec<u8> {
        match self {
            Attr::ErrCode(v) | Attr::McGroupId(v) => v.to_be_bytes().to_vec(),
            Attr::BridgeName(name) | Attr::PortName(name) => name.to_wire(),
            Attr::FdbCount(v) | Attr::FdbSkip(v) => v.to_be_bytes().to_vec(),
            Attr::FdbData(data) => data.to_vec(),
            Attr::IfIndexes(indexes) => {
                let mut out = Vec::with_capacity(indexes.len() * 4);
                for index in indexes {
                    out.extend_from_slice(&index.to_be_bytes());
                }
                out
            }
            Attr::DebugDir(s) | Attr::DebugName(s) | Attr::DebugData(s) => {
                let mut out = s.as_bytes().to_vec();
                out.push(0);
                out
            }
        }
    }

    fn decode(kind: u16, payload: &[u8]) -> Result<Attr, WireError> {
        let bad_len = || WireError::BadAttrLen {
            kind,
            len: payload.len(),
        };
        match kind {
            1 | 11 => {
                let raw: [u8; 4] = payload.try_into().map_err(|_| bad_len())?;
                let v = u32::from_be_bytes(raw);
                Ok(if kind == 1 {
                    Attr::ErrCode(v)
                } else {
                    Attr::McGroupId(v)
                })
            }
            2 => Ok(Attr::BridgeName(IfName::from_wire(payload)?)),
            3 => Ok(Attr::PortName(IfName::from_wire(payload)?)),
            4 | 5 => {
                let raw: [u8; 8] = payload.try_into().map_err(|_| bad_len())?;
                let v = u64::from_be_bytes(raw);
                Ok(if kind == 4 {
                    Attr::FdbCount(v)
                } else {
                    Attr::FdbSkip(v)
                })
            }
            6 => {
                if payload.len() % FdbEntry::WIRE_SIZE != 0 {
                    return Err(bad_len());
                }
                Ok(Attr::FdbData(Bytes::copy_from_slice(payload)))
            }
            7 => {
                if payload.len() % 4 != 0 {
                    return Err(bad_len());
                }
                let indexes = payload
                    .chunks_exact(4)
                    .map(|chunk| i32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                    .collect();
                Ok(Attr::IfIndexes(indexes))
            }
            8 | 9 | 10 => {
                let Some((0, body)) = payload.split_last() else {
                    return Err(WireError::BadString(kind));
                };
                let s = std::str::from_utf8(body)
                    .map_err(|_| WireError::BadString(kind))?;
                if s.bytes().any(|b| b == 0) {
                    return Err(WireError::BadString(kind));
                }
                Ok(match kind {
                    8 => Attr::DebugDir(s.to_string()),
                    9 => Attr::DebugName(s.to_string()),
                    _ => Attr::DebugData(s.to_string()),
                })
            }
            _ => Err(WireError::UnknownAttr(kind)),
        }
    }
}

/// One control-channel message: operation, sequence identifier and its
/// attribute set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    op: OpCode,
    seq: u32,
    attrs: Vec<Attr>,
}

impl Message {
    #[must_use]
    pub fn new(op: OpCode) -> Message {
        Message {
            op,
            seq: 0,
            attrs: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_attr(mut self, attr: Attr) -> Message {
        self.attrs.push(attr);
        self
    }

    #[must_use]
    pub const fn op(&self) -> OpCode {
        self.op
    }

    #[must_use]
    pub const fn seq(&self) -> u32 {
        self.seq
    }

    /// Stamp the sequence identifier.  Done exactly once, by the RPC session,
    /// immediately before the message is handed to the transport.
    pub const fn set_seq(&mut self, seq: u32) {
        self.seq = seq;
    }

    #[must_use]
    pub fn attrs(&self) -> &[Attr] {
        &self.attrs
    }

    #[must_use]
    pub fn err_code(&self) -> Option<u32> {
        self.attrs.iter().find_map(|attr| match attr {
            Attr::ErrCode(v) => Some(*v),
            _ => None,
        })
    }

    #[must_use]
    pub fn bridge_name(&self) -> Option<&IfName> {
        self.attrs.iter().find_map(|attr| match attr {
            Attr::BridgeName(name) => Some(name),
            _ => None,
        })
    }

    #[must_use]
    pub fn port_name(&self) -> Option<&IfName> {
        self.attrs.iter().find_map(|attr| match attr {
            Attr::PortName(name) => Some(name),
            _ => None,
        })
    }

    #[must_use]
    pub fn if_indexes(&self) -> Option<&[i32]> {
        self.attrs.iter().find_map(|attr| match attr {
            Attr::IfIndexes(indexes) => Some(indexes.as_slice()),
            _ => None,
        })
    }

    #[must_use]
    pub fn fdb_data(&self) -> Option<&Bytes> {
        self.attrs.iter().find_map(|attr| match attr {
            Attr::FdbData(data) => Some(data),
            _ => None,
        })
    }

    #[must_use]
    pub fn fdb_count(&self) -> Option<u64> {
        self.attrs.iter().find_map(|attr| match attr {
            Attr::FdbCount(v) => Some(*v),
            _ => None,
        })
    }

    #[must_use]
    pub fn fdb_skip(&self) -> Option<u64> {
        self.attrs.iter().find_map(|attr| match attr {
            Attr::FdbSkip(v) => Some(*v),
            _ => None,
        })
    }

    #[must_use]
    pub fn mc_group_id(&self) -> Option<u32> {
        self.attrs.iter().find_map(|attr| match attr {
            Attr::McGroupId(v) => Some(*v),
            _ => None,
        })
    }

    /// True iff this is a well-formed reply-class message: an
    /// `OperationResult` carrying the mandatory error-code attribute.
    #[must_use]
    pub fn is_reply(&self) -> bool {
        self.op == OpCode::OperationResult && self.err_code().is_some()
    }

    /// Encode this message into a frame ready for the transport.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + self.attrs.len() * 16);
        buf.put_u8(WIRE_VERSION);
        buf.put_u8(self.op.as_u8());
        buf.put_u8(0); // flags, reserved
        buf.put_u8(0);
        buf.put_u32(self.seq);
        for attr in &self.attrs {
            let payload = attr.payload();
            debug_assert!(u16::try_from(payload.len()).is_ok());
            buf.put_u16(attr.kind());
            #[allow(clippy::cast_possible_truncation)] // attr payloads are tiny
            buf.put_u16(payload.len() as u16);
            buf.put_slice(&payload);
            buf.put_bytes(0, pad_for(payload.len()));
        }
        buf.freeze()
    }

    /// Decode and validate a frame.
    pub fn decode(frame: &[u8]) -> Result<Message, WireError> {
        let mut buf = frame;
        if buf.remaining() < HEADER_SIZE {
            return Err(WireError::Truncated {
                expected: HEADER_SIZE,
                actual: buf.remaining(),
            });
        }
        let version = buf.get_u8();
        if version != WIRE_VERSION {
            return Err(WireError::BadVersion(version));
        }
        let raw_op = buf.get_u8();
        let op = OpCode::from_wire(raw_op).ok_or(WireError::UnknownOp(raw_op))?;
        buf.advance(2); // flags + reserved
        let seq = buf.get_u32();

        let mut attrs = Vec::new();
        while buf.has_remaining() {
            if buf.remaining() < ATTR_HEADER_SIZE {
                return Err(WireError::Truncated {
                    expected: ATTR_HEADER_SIZE,
                    actual: buf.remaining(),
                });
            }
            let kind = buf.get_u16();
            let len = buf.get_u16() as usize;
            if buf.remaining() < len {
                return Err(WireError::Truncated {
                    expected: len,
                    actual: buf.remaining(),
                });
            }
            attrs.push(Attr::decode(kind, &buf.chunk()[..len])?);
            buf.advance(len);
            buf.advance(pad_for(len).min(buf.remaining()));
        }
        Ok(Message { op, seq, attrs })
    }
}

/// Errors that can occur when decoding a frame.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("frame truncated: expected at least {expected} more bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("unsupported wire version {0}")]
    BadVersion(u8),
    #[error("unknown operation code {0}")]
    UnknownOp(u8),
    #[error("unknown attribute kind {0}")]
    UnknownAttr(u16),
    #[error("attribute kind {kind} has ill-sized payload of {len} bytes")]
    BadAttrLen { kind: u16, len: usize },
    #[error("attribute kind {0} is not a NUL-terminated utf-8 string")]
    BadString(u16),
    #[error(transparent)]
    Name(#[from] IfNameError),
}
