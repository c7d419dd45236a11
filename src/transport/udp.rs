//! # UDP Transport
//!
//! Host side of the WiFi bridge. The robot's bridge module runs a soft AP
//! and exchanges UDP datagrams with one fixed host address; every datagram
//! carries raw frames with no envelope on this side.

use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::info;

use super::Transport;
use crate::error::Result;

/// Default local address (the address the bridge sends to)
pub const DEFAULT_LOCAL_ADDR: &str = "192.168.4.2:1234";

/// Default robot address (the bridge's soft AP)
pub const DEFAULT_ROBOT_ADDR: &str = "192.168.4.1:1235";

/// Single-peer UDP transport
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    robot_addr: SocketAddr,
}

impl UdpTransport {
    /// Bind `local_addr` and accept datagrams from `robot_addr` only
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::SbrLinkError::Io`] if the socket cannot be
    /// bound or connected
    pub async fn bind(local_addr: SocketAddr, robot_addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(local_addr).await?;
        socket.connect(robot_addr).await?;
        info!("UDP link bound at {} (robot {})", socket.local_addr()?, robot_addr);

        Ok(Self { socket, robot_addr })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send(&mut self, data: &[u8]) -> io::Result<()> {
        let sent = self.socket.send(data).await?;
        if sent != data.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("datagram truncated: sent {} of {} bytes", sent, data.len()),
            ));
        }
        Ok(())
    }

    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.socket.recv(buf).await
    }

    fn describe(&self) -> String {
        format!("udp://{}", self.robot_addr)
    }
}
