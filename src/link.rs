//! # Packet Link
//!
//! Connects a transport, a framer and the packet decoder to exactly one
//! consumer of decoded packets.
//!
//! Frames that fail decoding are dropped silently as far as the peer is
//! concerned; the link only counts them and logs at `debug` level. The
//! application relies on periodic retransmission (telemetry is resent every
//! cycle) rather than on error replies.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use crate::error::{Result, SbrLinkError};
use crate::protocol::decoder::decode_frame;
use crate::protocol::encoder::encode_packet;
use crate::protocol::framer::{Framer, FramerConfig, FramerStats};
use crate::protocol::messages::Message;
use crate::protocol::packet::Packet;
use crate::transport::Transport;

/// Size of the scratch buffer for one transport read
const READ_CHUNK_SIZE: usize = 256;

/// Consumer of decoded packets
pub trait PacketHandler {
    fn handle(&mut self, packet: Packet);
}

impl<F> PacketHandler for F
where
    F: FnMut(Packet),
{
    fn handle(&mut self, packet: Packet) {
        self(packet)
    }
}

/// Handler that forwards packets onto a bounded channel
///
/// Packets are dropped when the consumer falls behind, in line with the
/// fire-and-forget nature of the protocol.
#[derive(Debug, Clone)]
pub struct ChannelHandler {
    tx: mpsc::Sender<Packet>,
}

impl ChannelHandler {
    pub fn new(tx: mpsc::Sender<Packet>) -> Self {
        Self { tx }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl PacketHandler for ChannelHandler {
    fn handle(&mut self, packet: Packet) {
        if let Err(e) = self.tx.try_send(packet) {
            debug!("Dropping decoded packet: {}", e);
        }
    }
}

/// Decode counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Packets delivered to the handler
    pub packets: u64,

    /// Frames rejected for a CRC mismatch
    pub crc_errors: u64,

    /// Frames rejected for size or unknown type
    pub malformed: u64,
}

/// Framer + decoder + handler
#[derive(Debug)]
pub struct PacketLink<H> {
    framer: Framer,
    handler: H,
    stats: DecodeStats,
}

impl<H: PacketHandler> PacketLink<H> {
    pub fn new(config: FramerConfig, handler: H) -> Self {
        Self {
            framer: Framer::new(config),
            handler,
            stats: DecodeStats::default(),
        }
    }

    /// Feed raw transport bytes; every valid packet reaches the handler once
    ///
    /// A span that fails decoding is rescanned from its next tag byte.
    pub fn ingest(&mut self, chunk: &[u8]) {
        let handler = &mut self.handler;
        let stats = &mut self.stats;

        self.framer.ingest_checked(chunk, |frame| match decode_frame(frame) {
            Ok(packet) => {
                stats.packets += 1;
                trace!("Decoded {:?} packet ({} bytes)", packet.packet_type(), packet.size());
                handler.handle(packet);
                true
            }
            Err(SbrLinkError::CrcMismatch { expected, actual }) => {
                stats.crc_errors += 1;
                debug!(
                    "Dropping frame: CRC mismatch (expected 0x{:02X}, got 0x{:02X})",
                    expected, actual
                );
                false
            }
            Err(e) => {
                stats.malformed += 1;
                debug!("Dropping frame: {}", e);
                false
            }
        });
    }

    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    pub fn framer_stats(&self) -> FramerStats {
        self.framer.stats()
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }
}

/// Async driver owning one transport and its receive state
#[derive(Debug)]
pub struct Link<T, H> {
    transport: T,
    receiver: PacketLink<H>,
    read_timeout: Duration,
}

impl<T, H> Link<T, H>
where
    T: Transport,
    H: PacketHandler + Send,
{
    pub fn new(transport: T, receiver: PacketLink<H>, read_timeout: Duration) -> Self {
        Self {
            transport,
            receiver,
            read_timeout,
        }
    }

    /// Encode and send one packet
    pub async fn send_packet(&mut self, packet: &Packet) -> Result<()> {
        let frame = encode_packet(packet);
        self.transport.send(&frame).await?;
        debug!(
            "Sent {:?} packet ({} bytes) to {}",
            packet.packet_type(),
            frame.len(),
            self.transport.describe()
        );
        Ok(())
    }

    /// Encode and send one typed message
    pub async fn send_message(&mut self, message: &Message) -> Result<()> {
        self.send_packet(&message.to_packet()).await
    }

    /// Read once (bounded by the read timeout) and feed the bytes through
    ///
    /// # Returns
    ///
    /// * `Result<bool>` - `false` once the transport reports end of stream
    pub async fn poll_once(&mut self) -> Result<bool> {
        let mut buf = [0u8; READ_CHUNK_SIZE];

        match timeout(self.read_timeout, self.transport.recv(&mut buf)).await {
            Err(_) => {
                trace!("No data within {:?}", self.read_timeout);
                Ok(true)
            }
            Ok(Ok(0)) => {
                info!("Transport {} closed", self.transport.describe());
                Ok(false)
            }
            Ok(Ok(n)) => {
                self.receiver.ingest(&buf[..n]);
                Ok(true)
            }
            Ok(Err(e)) => {
                warn!("Read from {} failed: {}", self.transport.describe(), e);
                Err(e.into())
            }
        }
    }

    /// Receive until the transport closes or fails
    pub async fn run(&mut self) -> Result<()> {
        info!("Receiving from {}", self.transport.describe());
        while self.poll_once().await? {}
        Ok(())
    }

    pub fn receiver(&self) -> &PacketLink<H> {
        &self.receiver
    }
}
