//! High-level XIU server API.
//!
//! Provides [`TunnelServer`] for answering handshakes and tracking one
//! session per client address.

use std::future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::time::{Interval, MissedTickBehavior, interval};
use tracing::{debug, info, trace, warn};

use crate::core::{CryptoError, EVICTION_INTERVAL, HandshakeError, MAX_DATAGRAM_SIZE};
use crate::crypto::Psk;
use crate::handshake::{AddressBinding, Responder};
use crate::session::SessionDirectory;
use crate::transport::TunnelSocket;
use crate::wire::{Packet, PacketType};

/// Errors that can occur in the XIU server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("bind failed: {0}")]
    BindFailed(String),

    /// Configuration cannot be used.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Cookie secret could not be generated.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,

    /// Pre-shared key.
    pub psk: Psk,

    /// Evict pending handshakes older than this. `None` keeps them forever.
    pub pending_ttl: Option<Duration>,

    /// Whether Finish must come from the Init's IP.
    pub address_binding: AddressBinding,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 51820)),
            psk: Psk::default(),
            pending_ttl: None,
            address_binding: AddressBinding::default(),
        }
    }
}

/// Builder for creating a [`ServerConfig`].
#[derive(Debug)]
pub struct TunnelServerBuilder {
    config: ServerConfig,
}

impl TunnelServerBuilder {
    /// Create a new server builder.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Set the bind address.
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.config.bind_addr = addr;
        self
    }

    /// Set the pre-shared key.
    pub fn psk(mut self, psk: impl Into<Psk>) -> Self {
        self.config.psk = psk.into();
        self
    }

    /// Enable eviction of pending handshakes older than `ttl`.
    pub fn pending_ttl(mut self, ttl: Duration) -> Self {
        self.config.pending_ttl = Some(ttl);
        self
    }

    /// Set the address binding policy.
    pub fn address_binding(mut self, binding: AddressBinding) -> Self {
        self.config.address_binding = binding;
        self
    }

    /// Build the server configuration.
    pub fn build(self) -> ServerConfig {
        self.config
    }
}

impl Default for TunnelServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// An XIU server.
///
/// # Example
///
/// ```ignore
/// use xiu::server::{TunnelServer, TunnelServerBuilder};
///
/// let config = TunnelServerBuilder::new()
///     .bind_addr("0.0.0.0:51820".parse()?)
///     .psk("correct horse battery staple")
///     .build();
///
/// let server = TunnelServer::bind(config).await?;
/// let sessions = server.sessions();
/// server.run().await;
/// ```
#[derive(Debug)]
pub struct TunnelServer {
    config: ServerConfig,
    socket: TunnelSocket,
    responder: Responder,
    sessions: Arc<SessionDirectory>,
    local_addr: SocketAddr,
}

impl TunnelServer {
    /// Bind the UDP socket and create the handshake responder.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        if config.psk.is_empty() {
            return Err(ServerError::InvalidConfig("psk must not be empty".into()));
        }

        let responder =
            Responder::new(config.psk.clone())?.with_address_binding(config.address_binding);

        let socket = TunnelSocket::bind(config.bind_addr)
            .await
            .map_err(|e| ServerError::BindFailed(format!("{}: {e}", config.bind_addr)))?;
        let local_addr = socket.local_addr()?;

        info!(listen = %local_addr, binding = ?config.address_binding, "server started");

        Ok(Self {
            config,
            socket,
            responder,
            sessions: Arc::new(SessionDirectory::new()),
            local_addr,
        })
    }

    /// Get the local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Shared handle to the session directory.
    pub fn sessions(&self) -> Arc<SessionDirectory> {
        Arc::clone(&self.sessions)
    }

    /// Number of handshakes awaiting Finish.
    pub fn pending_count(&self) -> usize {
        self.responder.pending_count()
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Process one datagram from `from`, returning the reply to send, if any.
    ///
    /// Invalid packets are logged and dropped without a reply.
    pub fn handle_datagram(&self, data: &[u8], from: SocketAddr) -> Option<Packet> {
        let packet = match Packet::decode(data) {
            Ok(packet) => packet,
            Err(e) => {
                debug!(%from, error = %e, "dropping undecodable datagram");
                return None;
            }
        };

        match packet.packet_type() {
            Some(PacketType::HandshakeInit) => match self.responder.handle_init(from, &packet) {
                Ok(resp) => {
                    debug!(%from, counter = packet.counter(), "answering handshake init");
                    Some(resp)
                }
                Err(e) => {
                    log_rejection(from, "init", &e);
                    None
                }
            },
            Some(PacketType::HandshakeFinish) => {
                match self.responder.handle_finish(from, &packet) {
                    Ok(key) => {
                        let fingerprint = key.fingerprint();
                        let generation = self.sessions.install(from, key);
                        info!(client = %from, generation, %fingerprint, "session established");
                    }
                    Err(e) => log_rejection(from, "finish", &e),
                }
                None
            }
            Some(PacketType::Keepalive) => {
                if !self.sessions.touch(from) {
                    trace!(%from, "keepalive without session");
                }
                None
            }
            _ => {
                trace!(%from, packet_type = packet.type_byte(), "ignoring packet");
                None
            }
        }
    }

    /// Run one eviction pass if a pending TTL is configured.
    ///
    /// Returns the number of pending handshakes removed.
    pub fn evict_expired(&self) -> usize {
        let Some(ttl) = self.config.pending_ttl else {
            return 0;
        };
        let evicted = self.responder.evict_expired(Instant::now(), ttl);
        if evicted > 0 {
            debug!(evicted, "evicted stale pending handshakes");
        }
        evicted
    }

    /// Receive loop. Never returns.
    ///
    /// Eviction ticks are multiplexed into the same loop when a pending TTL
    /// is configured.
    pub async fn run(self) {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let mut eviction = self.config.pending_ttl.map(|_| {
            let mut ticker = interval(EVICTION_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        loop {
            tokio::select! {
                received = self.socket.inner().recv_from(&mut buf) => {
                    let (len, from) = match received {
                        Ok(received) => received,
                        Err(e) => {
                            debug!(error = %e, "receive failed");
                            continue;
                        }
                    };
                    if let Some(reply) = self.handle_datagram(&buf[..len], from) {
                        if let Err(e) = self.socket.send_to(&reply.encode(), from).await {
                            warn!(%from, error = %e, "failed to send reply");
                        }
                    }
                }
                _ = tick(&mut eviction) => {
                    self.evict_expired();
                }
            }
        }
    }
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => future::pending().await,
    }
}

fn log_rejection(from: SocketAddr, stage: &str, error: &HandshakeError) {
    if error.is_security_error() {
        warn!(%from, stage, %error, "rejected handshake");
    } else {
        debug!(%from, stage, %error, "dropped handshake packet");
    }
}
