//! # Packet Encoder
//!
//! Serializes packets into CRC-protected, terminator-delimited frames.

use bytes::{BufMut, BytesMut};

use super::crc::{crc8_update, CRC8_INITIAL};
use super::packet::{Packet, FRAME_TERMINATOR};

/// Encode a packet into a complete frame
///
/// # Arguments
///
/// * `packet` - Packet to serialize
///
/// # Returns
///
/// * `Vec<u8>` - Complete frame (type + payload + crc + `\n\r`), `size + 4` bytes
///
/// # Examples
///
/// ```
/// use sbr_link::protocol::encoder::encode_packet;
/// use sbr_link::protocol::packet::{Packet, PacketType};
///
/// let packet = Packet::new(PacketType::ErrorReport, vec![0x01])?;
/// let frame = encode_packet(&packet);
/// assert_eq!(frame, vec![0xEE, 0x01, 0x45, b'\n', b'\r']);
/// # Ok::<(), sbr_link::error::SbrLinkError>(())
/// ```
pub fn encode_packet(packet: &Packet) -> Vec<u8> {
    let mut frame = BytesMut::with_capacity(packet.wire_size());
    encode_into(packet, &mut frame);
    frame.to_vec()
}

/// Append the frame of a packet to an existing buffer
///
/// Reserves `packet.wire_size()` bytes up front, so the buffer never holds a
/// partially written frame.
pub fn encode_into(packet: &Packet, dst: &mut BytesMut) {
    dst.reserve(packet.wire_size());

    let tag = packet.packet_type().tag();
    dst.put_u8(tag);

    let mut crc = crc8_update(CRC8_INITIAL, tag);
    for &byte in packet.payload() {
        dst.put_u8(byte);
        crc = crc8_update(crc, byte);
    }

    dst.put_u8(crc);
    dst.put_slice(&FRAME_TERMINATOR);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::crc::crc8;
    use crate::protocol::packet::{PacketType, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};

    #[test]
    fn test_encode_frame_structure() {
        let packet = Packet::new(PacketType::MotorCommand, vec![0x01, 0x00, 0x02, 0x00]).unwrap();
        let frame = encode_packet(&packet);

        assert_eq!(frame.len(), 8);
        assert_eq!(frame[0], 0x2F); // Type
        assert_eq!(&frame[1..5], &[0x01, 0x00, 0x02, 0x00]); // Payload
        assert_eq!(frame[5], 0x51); // CRC
        assert_eq!(&frame[6..], b"\n\r"); // Terminator
    }

    #[test]
    fn test_encode_empty_payload() {
        let packet = Packet::new(PacketType::RateCommand, Vec::new()).unwrap();
        let frame = encode_packet(&packet);

        assert_eq!(frame.len(), 4);
        assert_eq!(frame[1], crc8(&[0xA7]));
    }

    #[test]
    fn test_encode_max_payload() {
        let packet = Packet::new(PacketType::Telemetry, vec![0x5A; MAX_PAYLOAD_SIZE]).unwrap();
        let frame = encode_packet(&packet);

        assert_eq!(frame.len(), MAX_FRAME_SIZE);
        assert_eq!(frame[MAX_FRAME_SIZE - 3], crc8(&frame[..MAX_FRAME_SIZE - 3]));
    }

    #[test]
    fn test_encode_into_appends() {
        let first = Packet::new(PacketType::Telemetry, vec![0x01]).unwrap();
        let second = Packet::new(PacketType::ErrorReport, vec![0x02]).unwrap();

        let mut buffer = BytesMut::new();
        encode_into(&first, &mut buffer);
        encode_into(&second, &mut buffer);

        let mut expected = encode_packet(&first);
        expected.extend_from_slice(&encode_packet(&second));
        assert_eq!(&buffer[..], &expected[..]);
    }

    #[test]
    fn test_encode_different_data_different_crc() {
        let packet1 = Packet::new(PacketType::RateCommand, vec![0x88, 0x13, 0x00, 0x00]).unwrap();
        let packet2 = Packet::new(PacketType::RateCommand, vec![0x89, 0x13, 0x00, 0x00]).unwrap();

        assert_ne!(encode_packet(&packet1)[5], encode_packet(&packet2)[5]);
    }
}
