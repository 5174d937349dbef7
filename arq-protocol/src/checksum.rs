//! Packet integrity check
//!
//! A plain additive checksum over the header fields and payload. It catches
//! any single-field overwrite the channel performs; it is not meant to resist
//! deliberate tampering.

use crate::packet::Packet;

/// Compute the checksum of a packet
///
/// Sums `seqnum`, `acknum` and every payload byte. The stored `checksum`
/// field does not take part.
pub fn compute(packet: &Packet) -> i32 {
    packet
        .payload
        .iter()
        .fold(packet.seqnum.wrapping_add(packet.acknum), |sum, &byte| {
            sum.wrapping_add(i32::from(byte))
        })
}

/// Check whether the stored checksum disagrees with the packet contents
#[inline]
pub fn is_corrupted(packet: &Packet) -> bool {
    packet.checksum != compute(packet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{Message, NOT_IN_USE};

    #[test]
    fn test_compute_sums_fields() {
        let packet = Packet {
            seqnum: 3,
            acknum: NOT_IN_USE,
            checksum: 0,
            payload: [1; crate::packet::MSG_LEN],
        };
        assert_eq!(compute(&packet), 3 - 1 + 20);
    }

    #[test]
    fn test_fresh_packet_not_corrupted() {
        let packet = Packet::data(4, &Message::filled(b'c'));
        assert!(!is_corrupted(&packet));
    }

    #[test]
    fn test_payload_overwrite_detected() {
        let mut packet = Packet::data(4, &Message::filled(b'c'));
        packet.payload[0] = b'Z';
        assert!(is_corrupted(&packet));
    }

    #[test]
    fn test_header_overwrite_detected() {
        let mut packet = Packet::ack(2);
        packet.acknum = 999_999;
        assert!(is_corrupted(&packet));

        let mut packet = Packet::data(2, &Message::filled(b'a'));
        packet.seqnum = 999_999;
        assert!(is_corrupted(&packet));
    }

    #[test]
    fn test_extreme_fields_do_not_overflow() {
        let packet = Packet {
            seqnum: i32::MAX,
            acknum: i32::MAX,
            checksum: 0,
            payload: [0xFF; crate::packet::MSG_LEN],
        };
        let _ = compute(&packet);
    }
}
