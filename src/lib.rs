//! # SBR Link Library
//!
//! Framed packet link between a host and a two-wheeled self-balancing robot.
//!
//! This library provides the byte-stream framer, the packet codec with its
//! CRC-8 check, the typed messages exchanged in both directions, the
//! transports that carry them (serial and the UDP WiFi bridge) and the
//! robot-side command handling.

pub mod config;
pub mod error;
pub mod link;
pub mod protocol;
pub mod robot;
pub mod telemetry;
pub mod transport;
