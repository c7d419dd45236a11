//! # Transport Module
//!
//! Raw byte transports between the host and the robot.
//!
//! This module handles:
//! - A common async trait over "write bytes" / "read what is available"
//! - Serial links (wired UART, Bluetooth SPP, radio modems) via `tokio-serial`
//! - The UDP side of the WiFi bridge via `tokio::net::UdpSocket`
//!
//! Transports know nothing about frames; they move opaque bytes.

pub mod serial;
pub mod udp;

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub use serial::SerialTransport;
pub use udp::UdpTransport;

/// Trait for transport I/O operations
#[async_trait]
pub trait Transport: Send {
    /// Write all data to the transport
    async fn send(&mut self, data: &[u8]) -> io::Result<()>;

    /// Read whatever is available into `buf`, returning the byte count
    ///
    /// A return value of 0 means the peer closed the transport.
    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Human-readable endpoint description for logs
    fn describe(&self) -> String;
}

/// Transport over any async byte stream
///
/// Used for serial ports and, in tests, for in-memory mock streams.
pub struct StreamTransport<S> {
    stream: S,
    name: String,
}

impl<S> StreamTransport<S> {
    pub fn new(stream: S, name: impl Into<String>) -> Self {
        Self {
            stream,
            name: name.into(),
        }
    }
}

impl<S> std::fmt::Debug for StreamTransport<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamTransport")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream.write_all(data).await?;
        self.stream.flush().await
    }

    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf).await
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}
