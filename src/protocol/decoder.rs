//! # Packet Decoder
//!
//! Validates candidate frames produced by the framer and turns them back
//! into packets.

use super::crc::{crc8_update, CRC8_INITIAL};
use super::packet::*;
use crate::error::{Result, SbrLinkError};

/// Decode a complete frame
///
/// # Arguments
///
/// * `frame` - Frame bytes from the type tag through the `\n\r` terminator
///
/// # Returns
///
/// * `Result<Packet>` - Decoded packet, or error if invalid
///
/// # Errors
///
/// Returns error if:
/// - Frame is too short to hold type, crc and terminator
/// - Frame implies a payload above [`MAX_PAYLOAD_SIZE`]
/// - Type tag is unknown
/// - CRC check fails
///
/// The terminator bytes themselves are not inspected; the framer only emits
/// spans that end with one.
pub fn decode_frame(frame: &[u8]) -> Result<Packet> {
    if frame.len() < FRAME_OVERHEAD {
        return Err(SbrLinkError::FrameTooShort(frame.len()));
    }

    if frame.len() > MAX_FRAME_SIZE {
        return Err(SbrLinkError::FrameTooLong(frame.len()));
    }

    let packet_type = PacketType::try_from(frame[0])?;

    let crc_index = frame.len() - 3;
    let payload = &frame[1..crc_index];
    let received_crc = frame[crc_index];

    let calculated_crc = payload
        .iter()
        .fold(crc8_update(CRC8_INITIAL, frame[0]), |crc, &byte| crc8_update(crc, byte));

    if calculated_crc != received_crc {
        return Err(SbrLinkError::CrcMismatch {
            expected: calculated_crc,
            actual: received_crc,
        });
    }

    Packet::new(packet_type, payload.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::encoder::encode_packet;

    #[test]
    fn test_decode_frame_too_short() {
        let result = decode_frame(&[PACKET_TYPE_ERROR, 0x00, b'\n']);
        assert!(matches!(result, Err(SbrLinkError::FrameTooShort(3))));
    }

    #[test]
    fn test_decode_frame_too_long() {
        let mut frame = vec![PACKET_TYPE_TELEMETRY; MAX_FRAME_SIZE + 1];
        frame[MAX_FRAME_SIZE - 1] = b'\n';
        frame[MAX_FRAME_SIZE] = b'\r';

        let result = decode_frame(&frame);
        assert!(matches!(result, Err(SbrLinkError::FrameTooLong(35))));
    }

    #[test]
    fn test_decode_unknown_type() {
        let result = decode_frame(&[0x42, 0x00, 0x00, b'\n', b'\r']);
        assert!(matches!(result, Err(SbrLinkError::UnknownPacketType(0x42))));
    }

    #[test]
    fn test_decode_known_frame() {
        let frame = [0xEE, 0x01, 0x45, b'\n', b'\r'];
        let packet = decode_frame(&frame).unwrap();

        assert_eq!(packet.packet_type(), PacketType::ErrorReport);
        assert_eq!(packet.payload(), &[0x01]);
        assert_eq!(packet.size(), 1);
    }

    #[test]
    fn test_decode_crc_error() {
        let frame = [0xEE, 0x01, 0x46, b'\n', b'\r'];
        match decode_frame(&frame) {
            Err(SbrLinkError::CrcMismatch { expected, actual }) => {
                assert_eq!(expected, 0x45);
                assert_eq!(actual, 0x46);
            }
            other => panic!("Expected CrcMismatch, got: {:?}", other),
        }
    }

    #[test]
    fn test_round_trip_every_payload_size() {
        for packet_type in PacketType::ALL {
            for size in 0..=MAX_PAYLOAD_SIZE {
                let payload: Vec<u8> = (0..size).map(|i| (i * 37 + 11) as u8).collect();
                let packet = Packet::new(packet_type, payload).unwrap();

                let decoded = decode_frame(&encode_packet(&packet)).unwrap();
                assert_eq!(decoded, packet, "round trip failed for size {}", size);
            }
        }
    }

    #[test]
    fn test_single_bit_corruption_rejected() {
        let payload: Vec<u8> = (0..24u8).map(|i| i.wrapping_mul(29)).collect();
        let packet = Packet::new(PacketType::Telemetry, payload).unwrap();
        let frame = encode_packet(&packet);

        // Type byte and every payload byte, every bit
        for index in 0..frame.len() - 3 {
            for bit in 0..8 {
                let mut corrupted = frame.clone();
                corrupted[index] ^= 1 << bit;
                assert!(
                    decode_frame(&corrupted).is_err(),
                    "corruption of byte {} bit {} not detected",
                    index,
                    bit
                );
            }
        }
    }

    #[test]
    fn test_decode_ignores_terminator_content() {
        let packet = Packet::new(PacketType::RateCommand, vec![0x10, 0x27, 0x00, 0x00]).unwrap();
        let mut frame = encode_packet(&packet);
        let len = frame.len();
        frame[len - 2] = b'\r';
        frame[len - 1] = b'\n';

        assert_eq!(decode_frame(&frame).unwrap(), packet);
    }
}
