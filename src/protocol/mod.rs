//! # SBR Protocol Module
//!
//! Framing and packet layer shared by the robot and the host.
//!
//! This module handles:
//! - Segmenting raw transport bytes into candidate frames (direct and
//!   WiFi-tunneled conventions)
//! - Packet encoding with CRC-8 and `\n\r` terminator
//! - Frame validation and packet decoding
//! - Typed telemetry, error and command payloads

pub mod packet;
pub mod encoder;
pub mod decoder;
pub mod framer;
pub mod messages;
pub mod crc;
