//! # Error Types
//!
//! Custom error types for SBR Link using `thiserror`.

use thiserror::Error;

/// Main error type for SBR Link
#[derive(Debug, Error)]
pub enum SbrLinkError {
    /// Frame shorter than type + crc + terminator
    #[error("Frame too short: {0} bytes")]
    FrameTooShort(usize),

    /// Frame implies a payload above the protocol cap
    #[error("Frame too long: {0} bytes")]
    FrameTooLong(usize),

    /// CRC byte does not match the recomputed checksum
    #[error("CRC mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    CrcMismatch { expected: u8, actual: u8 },

    /// Type byte outside the closed tag set
    #[error("Unknown packet type: 0x{0:02X}")]
    UnknownPacketType(u8),

    /// Payload exceeds the protocol cap
    #[error("Payload size {size} exceeds maximum {max}")]
    PayloadTooLarge { size: usize, max: usize },

    /// Payload does not match the layout of its packet type
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial devices could be opened
    #[error("No serial device found (tried: {0})")]
    SerialPortNotFound(String),

    /// Telemetry record serialization errors
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] serde_json::Error),
}

/// Result type alias for SBR Link
pub type Result<T> = std::result::Result<T, SbrLinkError>;
