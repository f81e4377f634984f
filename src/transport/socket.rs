//! Async UDP socket wrapper for XIU datagrams.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::time::Instant;

use crate::core::MAX_DATAGRAM_SIZE;

/// Async UDP socket carrying XIU packets.
///
/// Owns a receive buffer sized for the largest UDP datagram. The inner socket
/// is reference counted so timer tasks can send on it concurrently.
#[derive(Debug)]
pub struct TunnelSocket {
    /// The underlying UDP socket.
    socket: Arc<UdpSocket>,
    /// Receive buffer.
    recv_buffer: Vec<u8>,
}

impl TunnelSocket {
    /// Create a socket bound to the given address.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self::from_socket(socket))
    }

    /// Wrap an existing UDP socket.
    pub fn from_socket(socket: UdpSocket) -> Self {
        Self {
            socket: Arc::new(socket),
            recv_buffer: vec![0u8; MAX_DATAGRAM_SIZE],
        }
    }

    /// Get the local address.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Send one datagram to `addr`.
    pub async fn send_to(&self, data: &[u8], addr: SocketAddr) -> io::Result<usize> {
        self.socket.send_to(data, addr).await
    }

    /// Receive one datagram and the sender's address.
    pub async fn recv_from(&mut self) -> io::Result<(&[u8], SocketAddr)> {
        let (len, addr) = self.socket.recv_from(&mut self.recv_buffer).await?;
        Ok((&self.recv_buffer[..len], addr))
    }

    /// Receive one datagram, giving up at `deadline`.
    ///
    /// Expiry is reported as [`io::ErrorKind::TimedOut`].
    pub async fn recv_from_deadline(
        &mut self,
        deadline: Instant,
    ) -> io::Result<(&[u8], SocketAddr)> {
        match tokio::time::timeout_at(deadline, self.socket.recv_from(&mut self.recv_buffer)).await
        {
            Ok(Ok((len, addr))) => Ok((&self.recv_buffer[..len], addr)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "receive deadline elapsed",
            )),
        }
    }

    /// Get a reference to the underlying socket.
    pub fn inner(&self) -> &UdpSocket {
        &self.socket
    }

    /// Get a clone of the Arc-wrapped socket.
    pub fn socket_arc(&self) -> Arc<UdpSocket> {
        Arc::clone(&self.socket)
    }
}
