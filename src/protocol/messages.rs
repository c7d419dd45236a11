//! # Typed Messages
//!
//! Payload layouts carried by each packet type. All multi-byte fields are
//! little-endian.
//!
//! | Type            | Tag  | Payload                                   |
//! |-----------------|------|-------------------------------------------|
//! | Telemetry       | 0x35 | 6 × f32: accel x/y/z, gyro x/y/z (24 B)   |
//! | Error report    | 0xEE | 1 × u8 error code                         |
//! | Rate command    | 0xA7 | 1 × u32 interval in microseconds          |
//! | Motor command   | 0x2F | 2 × i16 speeds: left, right               |

use serde::Serialize;

use super::packet::{Packet, PacketType};
use crate::error::{Result, SbrLinkError};

/// Telemetry payload size (six f32 values)
pub const TELEMETRY_PAYLOAD_SIZE: usize = 24;

/// Error report payload size
pub const ERROR_PAYLOAD_SIZE: usize = 1;

/// Rate command payload size
pub const RATE_COMMAND_PAYLOAD_SIZE: usize = 4;

/// Motor command payload size
pub const MOTOR_COMMAND_PAYLOAD_SIZE: usize = 4;

/// Accelerometer and gyroscope sample
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ImuSample {
    /// Acceleration in m/s² (x, y, z)
    pub accel: [f32; 3],

    /// Angular rate in rad/s (x, y, z)
    pub gyro: [f32; 3],
}

impl ImuSample {
    fn to_payload(self) -> Vec<u8> {
        self.accel
            .iter()
            .chain(self.gyro.iter())
            .flat_map(|value| value.to_le_bytes())
            .collect()
    }

    fn from_payload(payload: &[u8]) -> Result<Self> {
        expect_len(payload, TELEMETRY_PAYLOAD_SIZE, "telemetry")?;

        let mut values = [0f32; 6];
        for (value, chunk) in values.iter_mut().zip(payload.chunks_exact(4)) {
            *value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }

        Ok(Self {
            accel: [values[0], values[1], values[2]],
            gyro: [values[3], values[4], values[5]],
        })
    }
}

/// Error codes reported by the robot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Unclassified failure
    Other,
    /// Inertial sensor failed to initialize
    SensorInit,
    /// Inertial sensor read failed
    SensorRead,
    /// Command could not be applied
    IllegalCommand,
    /// Code this host does not know about
    Unknown(u8),
}

impl ErrorCode {
    pub fn code(self) -> u8 {
        match self {
            ErrorCode::Other => 0x00,
            ErrorCode::SensorInit => 0x01,
            ErrorCode::SensorRead => 0x02,
            ErrorCode::IllegalCommand => 0x03,
            ErrorCode::Unknown(code) => code,
        }
    }
}

impl From<u8> for ErrorCode {
    fn from(code: u8) -> Self {
        match code {
            0x00 => ErrorCode::Other,
            0x01 => ErrorCode::SensorInit,
            0x02 => ErrorCode::SensorRead,
            0x03 => ErrorCode::IllegalCommand,
            other => ErrorCode::Unknown(other),
        }
    }
}

/// A packet interpreted according to its type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Message {
    /// Sensor sample from the robot
    Telemetry(ImuSample),

    /// Error report from the robot
    Error(ErrorCode),

    /// Telemetry interval in microseconds requested by the host
    SetRate { interval_us: u32 },

    /// Motor speeds requested by the host (-255..=255, 0 brakes)
    SetMotors { left: i16, right: i16 },
}

impl Message {
    /// Serialize into a packet
    ///
    /// # Examples
    ///
    /// ```
    /// use sbr_link::protocol::messages::Message;
    /// use sbr_link::protocol::packet::PacketType;
    ///
    /// let packet = Message::SetMotors { left: -30, right: 30 }.to_packet();
    /// assert_eq!(packet.packet_type(), PacketType::MotorCommand);
    /// assert_eq!(packet.payload(), &[0xE2, 0xFF, 0x1E, 0x00]);
    /// ```
    pub fn to_packet(&self) -> Packet {
        let (packet_type, payload) = match *self {
            Message::Telemetry(sample) => (PacketType::Telemetry, sample.to_payload()),
            Message::Error(code) => (PacketType::ErrorReport, vec![code.code()]),
            Message::SetRate { interval_us } => {
                (PacketType::RateCommand, interval_us.to_le_bytes().to_vec())
            }
            Message::SetMotors { left, right } => {
                let mut payload = Vec::with_capacity(MOTOR_COMMAND_PAYLOAD_SIZE);
                payload.extend_from_slice(&left.to_le_bytes());
                payload.extend_from_slice(&right.to_le_bytes());
                (PacketType::MotorCommand, payload)
            }
        };

        Packet::from_fixed_layout(packet_type, payload)
    }

    /// Interpret a decoded packet
    ///
    /// # Errors
    ///
    /// Returns [`SbrLinkError::InvalidPayload`] if the payload length does
    /// not match the layout of the packet type
    pub fn from_packet(packet: &Packet) -> Result<Self> {
        let payload = packet.payload();

        match packet.packet_type() {
            PacketType::Telemetry => Ok(Message::Telemetry(ImuSample::from_payload(payload)?)),
            PacketType::ErrorReport => {
                expect_len(payload, ERROR_PAYLOAD_SIZE, "error report")?;
                Ok(Message::Error(ErrorCode::from(payload[0])))
            }
            PacketType::RateCommand => {
                expect_len(payload, RATE_COMMAND_PAYLOAD_SIZE, "rate command")?;
                Ok(Message::SetRate {
                    interval_us: u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]),
                })
            }
            PacketType::MotorCommand => {
                expect_len(payload, MOTOR_COMMAND_PAYLOAD_SIZE, "motor command")?;
                Ok(Message::SetMotors {
                    left: i16::from_le_bytes([payload[0], payload[1]]),
                    right: i16::from_le_bytes([payload[2], payload[3]]),
                })
            }
        }
    }
}

fn expect_len(payload: &[u8], expected: usize, what: &str) -> Result<()> {
    if payload.len() != expected {
        return Err(SbrLinkError::InvalidPayload(format!(
            "{} payload must be {} bytes, got {}",
            what,
            expected,
            payload.len()
        )));
    }
    Ok(())
}
