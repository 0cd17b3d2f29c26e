// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Fixed-size forwarding-table records.

/// One forwarding-table entry as carried in the `FdbData` attribute and
/// handed back to legacy callers.
///
/// The wire layout is the classic 16-byte bridge fdb record: 6 bytes of MAC,
/// port number, locality flag, 32-bit ageing timer, high port byte, and
/// 3 bytes of padding.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FdbEntry {
    pub mac_addr: [u8; 6],
    pub port_no: u8,
    pub is_local: bool,
    pub ageing_timer_value: u32,
    pub port_hi: u8,
}

impl FdbEntry {
    /// Wire size of one record in bytes.  `FdbData` attribute payloads must
    /// be an exact multiple of this.
    pub const WIRE_SIZE: usize = 16;

    /// Decode one record from exactly [`FdbEntry::WIRE_SIZE`] bytes.
    ///
    /// Infallible given a correctly sized slice; the caller (the attribute
    /// decoder) has already checked the payload length.
    #[must_use]
    pub fn from_wire(raw: &[u8; FdbEntry::WIRE_SIZE]) -> FdbEntry {
        let mut mac_addr = [0u8; 6];
        mac_addr.copy_from_slice(&raw[0..6]);
        FdbEntry {
            mac_addr,
            port_no: raw[6],
            is_local: raw[7] != 0,
            ageing_timer_value: u32::from_be_bytes([raw[8], raw[9], raw[10], raw[11]]),
            port_hi: raw[12],
        }
    }

    /// Encode this record into its 16-byte wire form.
    #[must_use]
    pub fn to_wire(&self) -> [u8; FdbEntry::WIRE_SIZE] {
        let mut out = [0u8; FdbEntry::WIRE_SIZE];
        out[0..6].copy_from_slice(&self.mac_addr);
        out[6] = self.port_no;
        out[7] = u8::from(self.is_local);
        out[8..12].copy_from_slice(&self.ageing_timer_value.to_be_bytes());
        out[12] = self.port_hi;
        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod test {
    use super::*;

    #[test]
    fn record_round_trips() {
        let entry = FdbEntry {
            mac_addr: [0xde, 0xad, 0xbe, 0xef, 0x00, 0x01],
            port_no: 3,
            is_local: true,
            ageing_timer_value: 299,
            port_hi: 0,
        };
        assert_eq!(FdbEntry::from_wire(&entry.to_wire()), entry);
    }

    #[test]
    fn padding_bytes_do_not_leak() {
        let entry = FdbEntry::default();
        assert_eq!(entry.to_wire()[13..], [0, 0, 0]);
    }
}
