//! # Packet Constants and Types
//!
//! Core protocol definitions shared by the robot and the host.
//!
//! Wire layout of one packet:
//!
//! ```text
//! ┌──────────┬──────────────────┬──────────┬───────────┐
//! │ Type (1B)│ Payload (0..=30B)│ CRC (1B) │ 0x0A 0x0D │
//! └──────────┴──────────────────┴──────────┴───────────┘
//! ```

use crate::error::{Result, SbrLinkError};

/// Telemetry packet type (accelerometer + gyroscope sample)
pub const PACKET_TYPE_TELEMETRY: u8 = 0x35;

/// Error report packet type
pub const PACKET_TYPE_ERROR: u8 = 0xEE;

/// Telemetry rate command packet type
pub const PACKET_TYPE_RATE_COMMAND: u8 = 0xA7;

/// Motor speed command packet type
pub const PACKET_TYPE_MOTOR_COMMAND: u8 = 0x2F;

/// Maximum payload size in one packet
pub const MAX_PAYLOAD_SIZE: usize = 30;

/// Frame terminator written after the CRC byte
pub const FRAME_TERMINATOR: [u8; 2] = [b'\n', b'\r'];

/// Bytes a frame carries in addition to its payload: type + crc + terminator
pub const FRAME_OVERHEAD: usize = 1 + 1 + FRAME_TERMINATOR.len();

/// Largest frame that can appear on the wire
pub const MAX_FRAME_SIZE: usize = MAX_PAYLOAD_SIZE + FRAME_OVERHEAD;

/// Packet type tag
///
/// The tag set is closed and identical on every transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    /// Sensor sample sent by the robot
    Telemetry,
    /// Error code sent by the robot
    ErrorReport,
    /// Telemetry interval command sent by the host
    RateCommand,
    /// Motor speed command sent by the host
    MotorCommand,
}

impl PacketType {
    /// Every packet type
    pub const ALL: [PacketType; 4] = [
        PacketType::ErrorReport,
        PacketType::Telemetry,
        PacketType::RateCommand,
        PacketType::MotorCommand,
    ];

    /// Types the robot sends and the host receives
    pub const FROM_ROBOT: [PacketType; 2] = [PacketType::Telemetry, PacketType::ErrorReport];

    /// Types the host sends and the robot receives
    pub const TO_ROBOT: [PacketType; 2] = [PacketType::RateCommand, PacketType::MotorCommand];

    /// Wire tag of this type
    pub const fn tag(self) -> u8 {
        match self {
            PacketType::Telemetry => PACKET_TYPE_TELEMETRY,
            PacketType::ErrorReport => PACKET_TYPE_ERROR,
            PacketType::RateCommand => PACKET_TYPE_RATE_COMMAND,
            PacketType::MotorCommand => PACKET_TYPE_MOTOR_COMMAND,
        }
    }
}

impl TryFrom<u8> for PacketType {
    type Error = SbrLinkError;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            PACKET_TYPE_TELEMETRY => Ok(PacketType::Telemetry),
            PACKET_TYPE_ERROR => Ok(PacketType::ErrorReport),
            PACKET_TYPE_RATE_COMMAND => Ok(PacketType::RateCommand),
            PACKET_TYPE_MOTOR_COMMAND => Ok(PacketType::MotorCommand),
            other => Err(SbrLinkError::UnknownPacketType(other)),
        }
    }
}

/// Decoded or to-be-encoded packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    packet_type: PacketType,
    payload: Vec<u8>,
}

impl Packet {
    /// Create a new packet
    ///
    /// # Arguments
    ///
    /// * `packet_type` - Packet type tag
    /// * `payload` - Payload data (max 30 bytes)
    ///
    /// # Errors
    ///
    /// Returns [`SbrLinkError::PayloadTooLarge`] if the payload exceeds
    /// [`MAX_PAYLOAD_SIZE`]
    ///
    /// # Examples
    ///
    /// ```
    /// use sbr_link::protocol::packet::{Packet, PacketType};
    ///
    /// let packet = Packet::new(PacketType::ErrorReport, vec![0x01])?;
    /// assert_eq!(packet.size(), 1);
    /// assert_eq!(packet.wire_size(), 5);
    /// # Ok::<(), sbr_link::error::SbrLinkError>(())
    /// ```
    pub fn new(packet_type: PacketType, payload: Vec<u8>) -> Result<Self> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(SbrLinkError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }

        Ok(Self {
            packet_type,
            payload,
        })
    }

    /// Build a packet from one of the fixed message layouts, all of which
    /// fit under [`MAX_PAYLOAD_SIZE`]
    pub(crate) fn from_fixed_layout(packet_type: PacketType, payload: Vec<u8>) -> Self {
        debug_assert!(payload.len() <= MAX_PAYLOAD_SIZE);
        Self {
            packet_type,
            payload,
        }
    }

    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload length in bytes
    ///
    /// Always within `0..=MAX_PAYLOAD_SIZE`.
    pub fn size(&self) -> u8 {
        self.payload.len() as u8
    }

    /// Encoded frame length (type + payload + crc + terminator)
    pub fn wire_size(&self) -> usize {
        self.payload.len() + FRAME_OVERHEAD
    }
}
