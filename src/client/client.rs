//! High-level XIU client API.
//!
//! Provides [`TunnelClient`] for establishing a session with an XIU server,
//! keeping it alive and re-keying when the server asks.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::net::lookup_host;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tracing::{debug, info, trace, warn};

use super::bootstrap::perform_handshake;
use crate::core::{HANDSHAKE_TIMEOUT, HandshakeError, KEEPALIVE_INTERVAL};
use crate::crypto::{Psk, SessionKey};
use crate::session::SessionDirectory;
use crate::transport::TunnelSocket;
use crate::wire::{Packet, PacketType};

/// Errors that can occur in the XIU client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Server address did not resolve.
    #[error("cannot resolve server address {0}")]
    Resolve(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Handshake failed.
    #[error("handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address as `host:port`, resolved at connect time.
    pub server: String,

    /// Pre-shared key.
    pub psk: Psk,

    /// How long to wait for the handshake response.
    pub handshake_timeout: Duration,

    /// Interval between keepalives.
    pub keepalive_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: "127.0.0.1:51820".to_string(),
            psk: Psk::default(),
            handshake_timeout: HANDSHAKE_TIMEOUT,
            keepalive_interval: KEEPALIVE_INTERVAL,
        }
    }
}

/// Builder for creating a [`ClientConfig`].
#[derive(Debug)]
pub struct TunnelClientBuilder {
    config: ClientConfig,
}

impl TunnelClientBuilder {
    /// Create a new client builder.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    /// Set the server address (`host:port`).
    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.config.server = server.into();
        self
    }

    /// Set the pre-shared key.
    pub fn psk(mut self, psk: impl Into<Psk>) -> Self {
        self.config.psk = psk.into();
        self
    }

    /// Set the handshake timeout.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    /// Set the keepalive interval.
    pub fn keepalive_interval(mut self, interval: Duration) -> Self {
        self.config.keepalive_interval = interval;
        self
    }

    /// Build the client configuration.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

impl Default for TunnelClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// An XIU client with an established session.
///
/// # Example
///
/// ```ignore
/// use xiu::client::{TunnelClient, TunnelClientBuilder};
///
/// let config = TunnelClientBuilder::new()
///     .server("vpn.example.com:51820")
///     .psk("correct horse battery staple")
///     .build();
///
/// let client = TunnelClient::connect(config).await?;
/// let _keepalive = client.spawn_keepalive();
/// client.run().await;
/// ```
#[derive(Debug)]
pub struct TunnelClient {
    config: ClientConfig,
    server: SocketAddr,
    socket: TunnelSocket,
    sessions: Arc<SessionDirectory>,
    counter: Arc<AtomicU64>,
}

impl TunnelClient {
    /// Resolve the server, bind an ephemeral socket and perform the handshake.
    pub async fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        if config.psk.is_empty() {
            return Err(ClientError::InvalidConfig("psk must not be empty".into()));
        }
        if config.handshake_timeout.is_zero() {
            return Err(ClientError::InvalidConfig(
                "handshake timeout must be non-zero".into(),
            ));
        }
        if config.keepalive_interval.is_zero() {
            return Err(ClientError::InvalidConfig(
                "keepalive interval must be non-zero".into(),
            ));
        }

        let server = lookup_host(config.server.as_str())
            .await
            .map_err(|_| ClientError::Resolve(config.server.clone()))?
            .next()
            .ok_or_else(|| ClientError::Resolve(config.server.clone()))?;

        let bind_addr = if server.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };
        let socket = TunnelSocket::bind(bind_addr).await?;

        let mut client = Self {
            config,
            server,
            socket,
            sessions: Arc::new(SessionDirectory::new()),
            counter: Arc::new(AtomicU64::new(0)),
        };
        client.handshake().await?;
        info!(%server, "session established");
        Ok(client)
    }

    /// Run a fresh handshake and install the resulting key.
    ///
    /// Returns the new session generation. On failure the previous key, if
    /// any, stays installed.
    pub async fn handshake(&mut self) -> Result<u64, HandshakeError> {
        let counter = self.next_counter();
        let key = perform_handshake(
            &mut self.socket,
            self.server,
            &self.config.psk,
            counter,
            self.config.handshake_timeout,
        )
        .await?;

        debug!(fingerprint = %key.fingerprint(), "installing session key");
        Ok(self.sessions.install(self.server, key))
    }

    /// Current session key.
    pub fn session_key(&self) -> Option<SessionKey> {
        self.sessions.key(self.server)
    }

    /// Shared handle to the client's session directory.
    pub fn sessions(&self) -> Arc<SessionDirectory> {
        Arc::clone(&self.sessions)
    }

    /// Resolved server address.
    pub fn server_addr(&self) -> SocketAddr {
        self.server
    }

    /// Local socket address.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Spawn the keepalive timer task.
    ///
    /// The first keepalive goes out one interval after spawning.
    pub fn spawn_keepalive(&self) -> JoinHandle<()> {
        let socket = self.socket.socket_arc();
        let server = self.server;
        let counter = Arc::clone(&self.counter);
        let period = self.config.keepalive_interval;

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let packet = Packet::new(
                    PacketType::Keepalive,
                    counter.fetch_add(1, Ordering::Relaxed),
                    Vec::new(),
                );
                if let Err(e) = socket.send_to(&packet.encode(), server).await {
                    warn!(%server, error = %e, "failed to send keepalive");
                }
            }
        })
    }

    /// Receive loop: re-key whenever the server sends Rekey.
    ///
    /// Never returns. Per-datagram failures are logged and skipped; a failed
    /// re-handshake keeps the old key.
    pub async fn run(mut self) {
        loop {
            let packet = match self.socket.recv_from().await {
                Ok((data, from)) if from == self.server => match Packet::decode(data) {
                    Ok(packet) => packet,
                    Err(e) => {
                        debug!(error = %e, "dropping undecodable datagram");
                        continue;
                    }
                },
                Ok((_, from)) => {
                    trace!(%from, "ignoring datagram from unexpected source");
                    continue;
                }
                Err(e) => {
                    debug!(error = %e, "receive failed");
                    continue;
                }
            };

            if packet.packet_type() != Some(PacketType::Rekey) {
                trace!(packet_type = packet.type_byte(), "ignoring packet");
                continue;
            }

            match self.handshake().await {
                Ok(generation) => info!(server = %self.server, generation, "rekeyed"),
                Err(e) => warn!(server = %self.server, error = %e, "rehandshake failed"),
            }
        }
    }

    fn next_counter(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handshake::Responder;

    async fn fake_server(psk: Psk) -> (TunnelSocket, Arc<Responder>, SocketAddr) {
        let socket = TunnelSocket::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let addr = socket.local_addr().unwrap();
        (socket, Arc::new(Responder::new(psk).unwrap()), addr)
    }

    async fn answer_handshake(socket: &mut TunnelSocket, responder: &Responder) -> SessionKey {
        let (data, from) = socket.recv_from().await.unwrap();
        let init = Packet::decode(data).unwrap();
        let resp = responder.handle_init(from, &init).unwrap();
        socket.send_to(&resp.encode(), from).await.unwrap();

        let (data, from) = socket.recv_from().await.unwrap();
        responder
            .handle_finish(from, &Packet::decode(data).unwrap())
            .unwrap()
    }

    #[test]
    fn test_builder() {
        let config = TunnelClientBuilder::new()
            .server("example.com:9000")
            .psk("secret")
            .handshake_timeout(Duration::from_secs(1))
            .keepalive_interval(Duration::from_secs(10))
            .build();

        assert_eq!(config.server, "example.com:9000");
        assert_eq!(config.psk.as_bytes(), b"secret");
        assert_eq!(config.handshake_timeout, Duration::from_secs(1));
        assert_eq!(config.keepalive_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.handshake_timeout, Duration::from_secs(5));
        assert_eq!(config.keepalive_interval, Duration::from_secs(25));
    }

    #[tokio::test]
    async fn test_connect_installs_key() {
        let psk = Psk::from("psk");
        let (mut socket, responder, addr) = fake_server(psk.clone()).await;
        let server = tokio::spawn(async move { answer_handshake(&mut socket, &responder).await });

        let config = TunnelClientBuilder::new()
            .server(addr.to_string())
            .psk(psk)
            .handshake_timeout(Duration::from_secs(2))
            .build();
        let client = TunnelClient::connect(config).await.unwrap();
        let server_key = server.await.unwrap();

        assert_eq!(client.server_addr(), addr);
        assert_eq!(
            client.session_key().unwrap().as_bytes(),
            server_key.as_bytes()
        );
        assert_eq!(client.sessions().get(addr).unwrap().generation(), 1);
    }

    #[tokio::test]
    async fn test_connect_times_out_against_silent_server() {
        let silent = TunnelSocket::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let config = TunnelClientBuilder::new()
            .server(silent.local_addr().unwrap().to_string())
            .psk("psk")
            .handshake_timeout(Duration::from_millis(100))
            .build();

        let err = TunnelClient::connect(config).await.unwrap_err();
        assert!(matches!(err, ClientError::Handshake(HandshakeError::Timeout)));
    }

    #[tokio::test]
    async fn test_connect_rejects_empty_psk() {
        let config = TunnelClientBuilder::new().server("127.0.0.1:9").build();
        let err = TunnelClient::connect(config).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidConfig(ref m) if m.contains("psk")));
    }

    #[tokio::test]
    async fn test_connect_rejects_zero_intervals() {
        let config = TunnelClientBuilder::new()
            .server("127.0.0.1:9")
            .psk("psk")
            .keepalive_interval(Duration::ZERO)
            .build();
        let err = TunnelClient::connect(config).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidConfig(ref m) if m.contains("keepalive")));

        let config = TunnelClientBuilder::new()
            .server("127.0.0.1:9")
            .psk("psk")
            .handshake_timeout(Duration::ZERO)
            .build();
        let err = TunnelClient::connect(config).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidConfig(ref m) if m.contains("handshake")));
    }

    #[tokio::test]
    async fn test_connect_unresolvable() {
        let config = TunnelClientBuilder::new()
            .server("not an address")
            .psk("psk")
            .build();
        let err = TunnelClient::connect(config).await.unwrap_err();
        assert!(matches!(err, ClientError::Resolve(_)));
    }

    #[tokio::test]
    async fn test_rekey_installs_new_key() {
        let psk = Psk::from("psk");
        let (mut socket, responder, addr) = fake_server(psk.clone()).await;

        let server = tokio::spawn(async move {
            let first = answer_handshake(&mut socket, &responder).await;
            (socket, responder, first)
        });

        let config = TunnelClientBuilder::new()
            .server(addr.to_string())
            .psk(psk)
            .handshake_timeout(Duration::from_secs(2))
            .build();
        let client = TunnelClient::connect(config).await.unwrap();
        let client_addr = SocketAddr::from(([127, 0, 0, 1], client.local_addr().unwrap().port()));
        let sessions = client.sessions();
        let (mut socket, responder, first) = server.await.unwrap();
        assert_eq!(sessions.key(addr).unwrap().as_bytes(), first.as_bytes());

        tokio::spawn(client.run());

        // The responder rate-limits Init per IP for one second.
        tokio::time::sleep(Duration::from_millis(1100)).await;
        let rekey = Packet::new(PacketType::Rekey, 0, Vec::new());
        socket.send_to(&rekey.encode(), client_addr).await.unwrap();
        let second = answer_handshake(&mut socket, &responder).await;

        let deadline = Instant::now() + Duration::from_secs(2);
        while sessions.get(addr).unwrap().generation() < 2 {
            assert!(Instant::now() < deadline, "client never rekeyed");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(sessions.key(addr).unwrap().as_bytes(), second.as_bytes());
        assert_ne!(first.as_bytes(), second.as_bytes());
    }

    #[tokio::test]
    async fn test_keepalive_sent() {
        let psk = Psk::from("psk");
        let (mut socket, responder, addr) = fake_server(psk.clone()).await;
        let server = tokio::spawn(async move {
            answer_handshake(&mut socket, &responder).await;
            socket
        });

        let config = TunnelClientBuilder::new()
            .server(addr.to_string())
            .psk(psk)
            .keepalive_interval(Duration::from_millis(50))
            .build();
        let client = TunnelClient::connect(config).await.unwrap();
        let mut socket = server.await.unwrap();

        let handle = client.spawn_keepalive();
        let (data, _) = socket.recv_from().await.unwrap();
        let packet = Packet::decode(data).unwrap();
        handle.abort();

        assert_eq!(packet.packet_type(), Some(PacketType::Keepalive));
        assert!(packet.payload().is_empty());
    }
}
